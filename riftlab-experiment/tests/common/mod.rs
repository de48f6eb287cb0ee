#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use riftlab_core::{DeviceError, Rgb, Side, StimulusMask};
use riftlab_experiment::{InputHost, Key};
use riftlab_render::{Placement, PresentInfo, PresentationHost};
use riftlab_timing::{CalibrationStats, Timer};

/// Virtual session clock: `sleep` advances time instead of waiting, so a
/// whole session runs in microseconds of wall time.
#[derive(Clone)]
pub struct SimTimer {
    now_ns: Arc<AtomicU64>,
    frames: Vec<Duration>,
}

impl SimTimer {
    pub fn new() -> Self {
        Self {
            now_ns: Arc::new(AtomicU64::new(0)),
            frames: Vec::new(),
        }
    }

    pub fn clock(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.now_ns)
    }
}

impl Timer for SimTimer {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }

    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }

    fn sleep(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    fn record_frame(&mut self, d: Duration) {
        self.frames.push(d);
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats {
            average_frame_time_ns: 0.0,
            jitter_ns: 0.0,
            min_frame_time_ns: 0.0,
            max_frame_time_ns: 0.0,
            effective_fps: 0.0,
        }
    }
}

/// Simulated display: `present` snaps the virtual clock to the next vblank
/// boundary, optionally stretched by injected per-present delays.
pub struct SimHost {
    clock: Arc<AtomicU64>,
    interval_ns: u64,
    /// Extra delay past the snapped vblank, keyed by present call ordinal.
    pub late: HashMap<usize, u64>,
    /// Timestamps of every presented frame, in order.
    pub presents: Vec<u64>,
    pub draws: Vec<(Side, Rgb)>,
    pub probes: usize,
    pub fixations: usize,
}

impl SimHost {
    pub fn new(clock: Arc<AtomicU64>, interval_ns: u64) -> Self {
        Self {
            clock,
            interval_ns,
            late: HashMap::new(),
            presents: Vec::new(),
            draws: Vec::new(),
            probes: 0,
            fixations: 0,
        }
    }
}

impl PresentationHost for SimHost {
    fn clear(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn draw(
        &mut self,
        placement: Placement,
        _mask: &StimulusMask,
        tint: Rgb,
    ) -> Result<(), DeviceError> {
        let side = if placement.x < 0.0 {
            Side::Left
        } else {
            Side::Right
        };
        self.draws.push((side, tint));
        Ok(())
    }

    fn draw_fixation(&mut self) -> Result<(), DeviceError> {
        self.fixations += 1;
        Ok(())
    }

    fn draw_probe(&mut self, _placement: Placement) -> Result<(), DeviceError> {
        self.probes += 1;
        Ok(())
    }

    fn present(&mut self) -> Result<PresentInfo, DeviceError> {
        let now = self.clock.load(Ordering::SeqCst);
        let mut ts = now.div_ceil(self.interval_ns) * self.interval_ns;
        if let Some(&extra) = self.late.get(&self.presents.len()) {
            ts += extra;
        }
        self.clock.store(ts, Ordering::SeqCst);
        self.presents.push(ts);
        Ok(PresentInfo {
            timestamp_ns: ts,
            missed_hint: false,
        })
    }

    fn placement(&self, side: Side) -> Placement {
        match side {
            Side::Left => Placement { x: -100.0, y: 0.0 },
            Side::Right => Placement { x: 100.0, y: 0.0 },
        }
    }
}

/// Scripted keyboard: each key reads as held down from its scripted
/// timestamp onward.
pub struct SimInput {
    clock: Arc<AtomicU64>,
    down_from: HashMap<Key, u64>,
}

impl SimInput {
    pub fn new(clock: Arc<AtomicU64>) -> Self {
        Self {
            clock,
            down_from: HashMap::new(),
        }
    }

    pub fn press_at(mut self, key: Key, at_ns: u64) -> Self {
        self.down_from.insert(key, at_ns);
        self
    }
}

impl InputHost for SimInput {
    fn is_down(&mut self, key: Key) -> Result<bool, DeviceError> {
        let now = self.clock.load(Ordering::SeqCst);
        Ok(self.down_from.get(&key).is_some_and(|&at| now >= at))
    }
}
