use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::clock::RefreshClock;
use crate::error::SetupError;
use crate::trial::Side;

pub type Rgb = [f32; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Waveform {
    /// Continuous modulation in [-1, 1], zero at frame 0.
    Sine,
    /// Abrupt switching in {-1, +1}; first half-cycle is +1.
    Square,
}

/// Fixed-length per-frame modulation values, precomputed once and never
/// mutated afterward. Identical inputs always yield an identical sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSequence {
    values: Vec<f64>,
    frequency_hz: f64,
    waveform: Waveform,
}

impl FrameSequence {
    pub fn build(
        duration_s: f64,
        clock: &RefreshClock,
        frequency_hz: f64,
        waveform: Waveform,
    ) -> Result<Self, SetupError> {
        if !duration_s.is_finite() || duration_s <= 0.0 {
            return Err(SetupError::InvalidDuration(duration_s));
        }
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(SetupError::InvalidFrequency(frequency_hz));
        }
        if clock.exceeds_nyquist(frequency_hz) {
            // Not an error: some designs rely on the aliased percept.
            tracing::warn!(
                frequency_hz,
                nyquist_hz = clock.nyquist_hz(),
                "flicker frequency above the Nyquist limit of the display; output will alias"
            );
        }

        let interval_s = clock.interval_secs();
        let len = clock.frame_count(duration_s);
        let values = (0..len)
            .map(|frame| {
                // Phase in cycles at this frame's nominal onset.
                let cycles = frequency_hz * frame as f64 * interval_s;
                match waveform {
                    Waveform::Sine => (TAU * cycles).sin(),
                    Waveform::Square => {
                        if cycles.fract() < 0.5 {
                            1.0
                        } else {
                            -1.0
                        }
                    }
                }
            })
            .collect();

        Ok(Self {
            values,
            frequency_hz,
            waveform,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, frame: usize) -> f64 {
        self.values[frame]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }
}

/// Valid per-channel output range. Clamping is saturating, never wrapping,
/// and each channel clamps independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityRange {
    pub min: f32,
    pub max: f32,
}

impl IntensityRange {
    pub fn new(min: f32, max: f32) -> Result<Self, SetupError> {
        if min > max {
            return Err(SetupError::EmptyIntensityRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

impl Default for IntensityRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// Affine map from a scalar modulation value to an RGB triple:
/// `channel = clamp(base + amplitude * modulation)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorMap {
    pub base: Rgb,
    pub amplitude: Rgb,
    pub range: IntensityRange,
}

impl ColorMap {
    /// Map whose extremes are two endpoint colors: modulation +1 yields
    /// `color_a`, -1 yields `color_b`, 0 their midpoint.
    pub fn from_endpoints(color_a: Rgb, color_b: Rgb, range: IntensityRange) -> Self {
        let mut base = [0.0; 3];
        let mut amplitude = [0.0; 3];
        for c in 0..3 {
            base[c] = (color_a[c] + color_b[c]) / 2.0;
            amplitude[c] = (color_a[c] - color_b[c]) / 2.0;
        }
        Self {
            base,
            amplitude,
            range,
        }
    }

    /// Scale endpoint luminance and pull the endpoints toward a background
    /// gray, before any frame is computed.
    pub fn conditioned(self, luminance: f32, saturation: f32, background: f32) -> Self {
        let condition = |v: f32| background + (v * luminance - background) * saturation;
        let mut a = [0.0; 3];
        let mut b = [0.0; 3];
        for c in 0..3 {
            a[c] = condition(self.base[c] + self.amplitude[c]);
            b[c] = condition(self.base[c] - self.amplitude[c]);
        }
        Self::from_endpoints(a, b, self.range)
    }

    pub fn apply(&self, modulation: f64) -> Rgb {
        let mut out = [0.0; 3];
        for c in 0..3 {
            out[c] = self
                .range
                .clamp(self.base[c] + self.amplitude[c] * modulation as f32);
        }
        out
    }
}

/// Per-frame RGB triples for one stimulus. Immutable once built; shared
/// read-only across trials whose content is identical.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTrack(Vec<Rgb>);

impl ColorTrack {
    pub fn from_modulation(sequence: &FrameSequence, map: &ColorMap) -> Self {
        Self(sequence.values().iter().map(|&m| map.apply(m)).collect())
    }

    pub fn uniform(color: Rgb, len: usize) -> Self {
        Self(vec![color; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn frame(&self, frame: usize) -> Rgb {
        self.0[frame]
    }
}

/// One presentation's complete render parameters: an optional color track
/// per side, consumed by the frame scheduler.
#[derive(Debug, Clone)]
pub struct FramePlan {
    left: Option<ColorTrack>,
    right: Option<ColorTrack>,
    len: usize,
}

impl FramePlan {
    pub fn new(left: Option<ColorTrack>, right: Option<ColorTrack>) -> Self {
        let len = left
            .as_ref()
            .map(ColorTrack::len)
            .max(right.as_ref().map(ColorTrack::len))
            .unwrap_or(0);
        Self { left, right, len }
    }

    pub fn blank(len: usize) -> Self {
        Self {
            left: None,
            right: None,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tint for `side` at `frame`, if that side draws anything this frame.
    pub fn tint(&self, side: Side, frame: usize) -> Option<Rgb> {
        let track = match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        };
        track.filter(|t| frame < t.len()).map(|t| t.frame(frame))
    }
}
