use serde::{Deserialize, Serialize};

/// One presentation whose actual display instant overshot its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMiss {
    pub frame: usize,
    pub overshoot_s: f64,
}

/// Per-trial ledger of missed deadlines. Created empty at trial start,
/// appended to only by the frame scheduler, read-only afterward. Misses are
/// telemetry, never shown to the participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DroppedFrameReport {
    misses: Vec<FrameMiss>,
}

impl DroppedFrameReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, frame: usize, overshoot_s: f64) {
        debug_assert!(overshoot_s > 0.0);
        self.misses.push(FrameMiss { frame, overshoot_s });
    }

    pub fn count(&self) -> usize {
        self.misses.len()
    }

    pub fn is_clean(&self) -> bool {
        self.misses.is_empty()
    }

    pub fn misses(&self) -> &[FrameMiss] {
        &self.misses
    }

    pub fn worst_overshoot_s(&self) -> f64 {
        self.misses
            .iter()
            .map(|m| m.overshoot_s)
            .fold(0.0, f64::max)
    }

    /// Fold another presentation's report into this one, offsetting its
    /// frame indices so per-trial indices stay unambiguous.
    pub fn absorb(&mut self, other: DroppedFrameReport, frame_offset: usize) {
        for miss in other.misses {
            self.misses.push(FrameMiss {
                frame: miss.frame + frame_offset,
                overshoot_s: miss.overshoot_s,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order_with_overshoots() {
        let mut report = DroppedFrameReport::new();
        report.record(3, 0.004);
        report.record(17, 0.010);
        assert_eq!(report.count(), 2);
        assert_eq!(report.misses()[0].frame, 3);
        assert_eq!(report.worst_overshoot_s(), 0.010);
    }

    #[test]
    fn absorb_offsets_frame_indices() {
        let mut cue = DroppedFrameReport::new();
        cue.record(5, 0.002);
        let mut probe = DroppedFrameReport::new();
        probe.record(1, 0.003);

        cue.absorb(probe, 30);
        assert_eq!(cue.count(), 2);
        assert_eq!(cue.misses()[1].frame, 31);
    }
}
