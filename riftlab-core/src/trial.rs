use serde::{Deserialize, Serialize};

use crate::report::DroppedFrameReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// The answer a condition expects, fixed when the trial table is generated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpectedAnswer {
    Side(Side),
    Match(bool),
}

/// Categorical response outcome for one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseCode {
    None,
    Left,
    Right,
    Same,
    Different,
}

/// Correctness is a pure function of response and expectation, with no
/// hidden state. A trial without a response scores as undefined, not wrong.
pub fn score(response: ResponseCode, expected: ExpectedAnswer) -> Option<bool> {
    match response {
        ResponseCode::None => None,
        ResponseCode::Left => Some(expected == ExpectedAnswer::Side(Side::Left)),
        ResponseCode::Right => Some(expected == ExpectedAnswer::Side(Side::Right)),
        ResponseCode::Same => Some(expected == ExpectedAnswer::Match(true)),
        ResponseCode::Different => Some(expected == ExpectedAnswer::Match(false)),
    }
}

/// Opaque per-trial input from the external condition generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialCondition {
    pub cued_side: Side,
    pub probe_side: Side,
    pub expected: ExpectedAnswer,
}

/// One trial's outcome. Condition fields are pre-filled before
/// presentation; response fields are filled exactly once after the response
/// window closes and never mutated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    pub index: usize,
    pub condition: TrialCondition,
    pub response: ResponseCode,
    /// Seconds from the probed event's actual first-frame presentation
    /// timestamp, absent when no response arrived.
    pub reaction_time_s: Option<f64>,
    pub timed_out: bool,
    pub correct: Option<bool>,
    pub dropped: DroppedFrameReport,
}

impl TrialRecord {
    pub fn pending(index: usize, condition: TrialCondition) -> Self {
        Self {
            index,
            condition,
            response: ResponseCode::None,
            reaction_time_s: None,
            timed_out: false,
            correct: None,
            dropped: DroppedFrameReport::new(),
        }
    }
}

/// Append-only ordered collection of trial records keyed by a monotonically
/// increasing trial index, finalized at session end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionResult {
    records: Vec<TrialRecord>,
}

impl SessionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TrialRecord) {
        debug_assert_eq!(record.index, self.records.len());
        self.records.push(record);
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_dropped_frames(&self) -> usize {
        self.records.iter().map(|r| r.dropped.count()).sum()
    }

    pub fn worst_overshoot_s(&self) -> f64 {
        self.records
            .iter()
            .map(|r| r.dropped.worst_overshoot_s())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_responses_score_against_expected_side() {
        let expected = ExpectedAnswer::Side(Side::Left);
        assert_eq!(score(ResponseCode::Left, expected), Some(true));
        assert_eq!(score(ResponseCode::Right, expected), Some(false));
    }

    #[test]
    fn match_responses_score_against_match_expectation() {
        assert_eq!(
            score(ResponseCode::Same, ExpectedAnswer::Match(true)),
            Some(true)
        );
        assert_eq!(
            score(ResponseCode::Different, ExpectedAnswer::Match(true)),
            Some(false)
        );
        assert_eq!(
            score(ResponseCode::Different, ExpectedAnswer::Match(false)),
            Some(true)
        );
    }

    #[test]
    fn missing_response_is_undefined_not_false() {
        assert_eq!(score(ResponseCode::None, ExpectedAnswer::Side(Side::Left)), None);
        assert_eq!(score(ResponseCode::None, ExpectedAnswer::Match(true)), None);
    }

    #[test]
    fn cross_category_responses_are_wrong_not_undefined() {
        assert_eq!(
            score(ResponseCode::Same, ExpectedAnswer::Side(Side::Left)),
            Some(false)
        );
    }

    #[test]
    fn session_result_aggregates_dropped_frames() {
        let condition = TrialCondition {
            cued_side: Side::Left,
            probe_side: Side::Left,
            expected: ExpectedAnswer::Side(Side::Left),
        };
        let mut result = SessionResult::new();
        let mut first = TrialRecord::pending(0, condition);
        first.dropped.record(2, 0.004);
        first.dropped.record(9, 0.011);
        result.push(first);
        result.push(TrialRecord::pending(1, condition));

        assert_eq!(result.len(), 2);
        assert_eq!(result.total_dropped_frames(), 2);
        assert_eq!(result.worst_overshoot_s(), 0.011);
    }
}
