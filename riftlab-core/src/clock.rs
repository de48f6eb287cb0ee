use std::time::Duration;

use crate::error::SetupError;

/// Immutable per-session refresh timing, measured once at startup.
///
/// Every scheduling deadline is an integer multiple of this interval from a
/// fixed origin timestamp; the interval is never re-measured mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshClock {
    interval_ns: u64,
}

impl RefreshClock {
    pub fn from_interval(interval: Duration) -> Result<Self, SetupError> {
        let interval_ns = interval.as_nanos() as u64;
        if interval_ns == 0 {
            return Err(SetupError::InvalidInterval(interval.as_secs_f64()));
        }
        Ok(Self { interval_ns })
    }

    pub fn from_rate_hz(rate_hz: f64) -> Result<Self, SetupError> {
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Err(SetupError::InvalidInterval(1.0 / rate_hz));
        }
        Self::from_interval(Duration::from_secs_f64(1.0 / rate_hz))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_ns)
    }

    pub fn interval_ns(&self) -> u64 {
        self.interval_ns
    }

    pub fn interval_secs(&self) -> f64 {
        self.interval_ns as f64 / 1e9
    }

    pub fn rate_hz(&self) -> f64 {
        1e9 / self.interval_ns as f64
    }

    pub fn nyquist_hz(&self) -> f64 {
        self.rate_hz() / 2.0
    }

    /// Frequencies above half the refresh rate alias; flagged, not rejected.
    pub fn exceeds_nyquist(&self, frequency_hz: f64) -> bool {
        frequency_hz > self.nyquist_hz()
    }

    /// Number of frames spanning `duration_s`, rounded, never zero.
    pub fn frame_count(&self, duration_s: f64) -> usize {
        (duration_s / self.interval_secs()).round().max(1.0) as usize
    }

    /// Deadline for frame `frame`, anchored to `origin_ns`.
    ///
    /// Deadlines are `origin + i * interval`, never `previous_actual +
    /// interval`, so jitter in earlier frames cannot accumulate into drift.
    pub fn deadline_ns(&self, origin_ns: u64, frame: usize) -> u64 {
        origin_ns + frame as u64 * self.interval_ns
    }

    /// Overshoot beyond which a presentation counts as missed. `fraction`
    /// scales with the measured interval rather than any fixed frame budget.
    pub fn miss_threshold(&self, fraction: f64) -> Duration {
        Duration::from_nanos((self.interval_ns as f64 * fraction) as u64)
    }

    /// Grace window before a deadline in which presentation may already be
    /// requested, so an early hardware swap does not cost a full interval.
    pub fn half_interval(&self) -> Duration {
        Duration::from_nanos(self.interval_ns / 2)
    }
}
