mod common;

use std::io;

use common::{SimHost, SimInput, SimTimer};
use rand::SeedableRng;
use rand::rngs::StdRng;
use riftlab_core::{
    ExpectedAnswer, RefreshClock, ResponseCode, SessionError, SessionResult, Side, TrialCondition,
    TrialRecord,
};
use riftlab_experiment::{ExperimentConfig, Key, NullTrigger, ResponsePolicy, ResultSink, Session};

#[derive(Default)]
struct VecSink {
    appended: Vec<TrialRecord>,
    finalized: Option<usize>,
}

impl ResultSink for VecSink {
    fn append(&mut self, record: &TrialRecord) -> io::Result<()> {
        self.appended.push(record.clone());
        Ok(())
    }

    fn finalize(&mut self, result: &SessionResult) -> io::Result<()> {
        self.finalized = Some(result.len());
        Ok(())
    }
}

/// Short deterministic session: 6 fixation, 30 cue, 12 probe frames per
/// trial at 60 Hz, fixed jitter so phase boundaries are predictable.
fn test_config() -> ExperimentConfig {
    let mut config = ExperimentConfig::default();
    config.stimulus_radius_px = 8;
    config.cue_duration_s = 0.5;
    config.probe_duration_s = 0.2;
    config.fixation_range_s = (0.1, 0.1);
    config.intertrial_range_s = (0.05, 0.05);
    config.response_timeout_s = 1.0;
    config.feedback_duration_s = 0.0;
    config
}

fn left_condition() -> TrialCondition {
    TrialCondition {
        cued_side: Side::Left,
        probe_side: Side::Left,
        expected: ExpectedAnswer::Side(Side::Left),
    }
}

fn session(
    config: ExperimentConfig,
    conditions: Vec<TrialCondition>,
) -> (Session<SimTimer, StdRng>, SimTimer, RefreshClock) {
    let clock = RefreshClock::from_rate_hz(60.0).unwrap();
    let timer = SimTimer::new();
    let session = Session::new(config, clock, timer.clone(), StdRng::seed_from_u64(7), conditions)
        .unwrap();
    (session, timer, clock)
}

#[test]
fn reaction_time_runs_from_actual_probe_onset() {
    let (mut session, timer, clock) = session(test_config(), vec![left_condition()]);
    let mut host = SimHost::new(timer.clock(), clock.interval_ns());
    // Well past the probe's last frame, inside the response window.
    let press_ns = 1_000_000_000;
    let mut input = SimInput::new(timer.clock()).press_at(Key::Left, press_ns);
    let mut sink = VecSink::default();

    let result = session
        .run(&mut host, &mut input, &mut NullTrigger, &mut sink)
        .unwrap();

    let record = &result.records()[0];
    assert_eq!(record.response, ResponseCode::Left);
    assert_eq!(record.correct, Some(true));
    assert!(!record.timed_out);

    // 6 fixation + 30 cue frames precede the probe.
    let probe_onset = host.presents[36];
    let rt = record.reaction_time_s.unwrap();
    let lower = (press_ns - probe_onset) as f64 / 1e9;
    // The collector samples every 0.5 ms, so the observed press lags the
    // physical press by at most one poll interval.
    assert!(rt >= lower, "rt {rt} below {lower}");
    assert!(rt < lower + 0.002, "rt {rt} too far past {lower}");
}

#[test]
fn reaction_time_anchors_to_delayed_probe_onset() {
    let (mut session, timer, clock) = session(test_config(), vec![left_condition()]);
    let mut host = SimHost::new(timer.clock(), clock.interval_ns());
    // The probe's first frame stalls three refreshes; its physical onset is
    // what the participant saw, so RT must measure from there.
    host.late.insert(36, 3 * clock.interval_ns());
    let press_ns = 1_200_000_000;
    let mut input = SimInput::new(timer.clock()).press_at(Key::Left, press_ns);
    let mut sink = VecSink::default();

    let result = session
        .run(&mut host, &mut input, &mut NullTrigger, &mut sink)
        .unwrap();

    let record = &result.records()[0];
    let probe_onset = host.presents[36];
    let rt = record.reaction_time_s.unwrap();
    let lower = (press_ns - probe_onset) as f64 / 1e9;
    assert!(rt >= lower, "rt {rt} below {lower}");
    assert!(rt < lower + 0.002, "rt {rt} too far past {lower}");

    // A slow first frame shifts the anchor; it is not itself a miss.
    assert!(record.dropped.is_clean());
}

#[test]
fn no_response_times_out_as_undefined_not_wrong() {
    let (mut session, timer, clock) = session(test_config(), vec![left_condition()]);
    let mut host = SimHost::new(timer.clock(), clock.interval_ns());
    let mut input = SimInput::new(timer.clock());
    let mut sink = VecSink::default();

    let result = session
        .run(&mut host, &mut input, &mut NullTrigger, &mut sink)
        .unwrap();

    let record = &result.records()[0];
    assert_eq!(record.response, ResponseCode::None);
    assert!(record.timed_out);
    assert_eq!(record.correct, None);
    assert_eq!(record.reaction_time_s, None);

    // The probe dot was drawn on every probe frame despite the silence.
    assert_eq!(host.probes, 12);
    assert_eq!(host.presents.len(), 48);
}

#[test]
fn abort_ends_the_session_and_flushes_partial_results() {
    let (mut session, timer, clock) =
        session(test_config(), vec![left_condition(), left_condition()]);
    let mut host = SimHost::new(timer.clock(), clock.interval_ns());
    // Mid-cue of the first trial.
    let mut input = SimInput::new(timer.clock()).press_at(Key::Abort, 300_000_000);
    let mut sink = VecSink::default();

    let err = session
        .run(&mut host, &mut input, &mut NullTrigger, &mut sink)
        .unwrap_err();

    assert!(matches!(err, SessionError::Aborted));
    assert!(sink.appended.is_empty());
    assert_eq!(sink.finalized, Some(0));
    // Cancellation lands at a frame boundary, never after the full plan.
    assert!(host.presents.len() < 36);
}

#[test]
fn ends_stimulus_policy_cuts_the_flicker_short() {
    let mut config = test_config();
    config.response_policy = ResponsePolicy::EndsStimulus;
    let (mut session, timer, clock) = session(config, vec![left_condition()]);
    let mut host = SimHost::new(timer.clock(), clock.interval_ns());
    // Mid-cue; wrong side, which still counts as a response.
    let mut input = SimInput::new(timer.clock()).press_at(Key::Right, 300_000_000);
    let mut sink = VecSink::default();

    let result = session
        .run(&mut host, &mut input, &mut NullTrigger, &mut sink)
        .unwrap();

    let record = &result.records()[0];
    assert_eq!(record.response, ResponseCode::Right);
    assert_eq!(record.correct, Some(false));

    // The cue stops within a frame of the press and the probe never runs.
    assert!(host.presents.len() < 36);
    assert_eq!(host.probes, 0);

    // With no probe, reaction time anchors to the cue's actual onset.
    let cue_onset = host.presents[6];
    let rt = record.reaction_time_s.unwrap();
    assert!(rt >= (300_000_000 - cue_onset) as f64 / 1e9);
    assert!(rt < 0.5);
}

#[test]
fn completed_session_appends_every_trial_in_order() {
    let conditions = vec![
        left_condition(),
        TrialCondition {
            cued_side: Side::Right,
            probe_side: Side::Right,
            expected: ExpectedAnswer::Side(Side::Right),
        },
    ];
    let (mut session, timer, clock) = session(test_config(), conditions);
    let mut host = SimHost::new(timer.clock(), clock.interval_ns());
    let mut input = SimInput::new(timer.clock());
    let mut sink = VecSink::default();

    let result = session
        .run(&mut host, &mut input, &mut NullTrigger, &mut sink)
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(sink.appended.len(), 2);
    assert_eq!(sink.finalized, Some(2));
    assert_eq!(sink.appended[0].index, 0);
    assert_eq!(sink.appended[1].index, 1);
    assert_eq!(sink.appended[1].condition.cued_side, Side::Right);
}

#[test]
fn late_frames_enter_the_trial_report_with_probe_offset() {
    let (mut session, timer, clock) = session(test_config(), vec![left_condition()]);
    let mut host = SimHost::new(timer.clock(), clock.interval_ns());
    let stall = (clock.interval_ns() as f64 * 0.8) as u64;
    // Present ordinal 10 is cue frame 4; ordinal 38 is probe frame 2.
    host.late.insert(10, stall);
    host.late.insert(38, stall);
    let mut input = SimInput::new(timer.clock());
    let mut sink = VecSink::default();

    let result = session
        .run(&mut host, &mut input, &mut NullTrigger, &mut sink)
        .unwrap();

    let record = &result.records()[0];
    assert_eq!(record.dropped.count(), 2);
    assert_eq!(record.dropped.misses()[0].frame, 4);
    // Probe frame indices continue after the cue's 30 frames.
    assert_eq!(record.dropped.misses()[1].frame, 32);
}
