use std::time::Duration;

use rand::Rng;
use riftlab_core::{
    FramePlan, RefreshClock, SessionError, StimulusMask, TrialCondition, TrialRecord, score,
};
use riftlab_render::PresentationHost;
use riftlab_timing::Timer;

use crate::config::{ExperimentConfig, ResponsePolicy};
use crate::response::{
    InputHost, Key, Poll, ResponseOutcome, allowed_keys, await_response, poll_once,
};
use crate::schedule::{FramePoll, FrameScheduler, Scene};
use crate::trigger::{self, TriggerLine};

/// Runs one trial end to end: fixation, cue, probe, response window,
/// optional feedback, intertrial pause. All phases run on one logical
/// thread; input is sampled cooperatively between frames, never from a
/// second thread.
pub struct TrialRunner<T: Timer<Timestamp = u64>, R: Rng> {
    scheduler: FrameScheduler<T>,
    timer: T,
    rng: R,
    clock: RefreshClock,
    config: ExperimentConfig,
    mask: StimulusMask,
    cue_plan: FramePlan,
    probe_plan: FramePlan,
}

impl<T: Timer<Timestamp = u64>, R: Rng> TrialRunner<T, R> {
    pub fn new(
        clock: RefreshClock,
        timer: T,
        rng: R,
        config: ExperimentConfig,
        mask: StimulusMask,
        cue_plan: FramePlan,
        probe_plan: FramePlan,
    ) -> Self {
        let scheduler = FrameScheduler::new(clock, timer.clone(), config.miss_threshold_fraction);
        Self {
            scheduler,
            timer,
            rng,
            clock,
            config,
            mask,
            cue_plan,
            probe_plan,
        }
    }

    pub fn run<H, I, L>(
        &mut self,
        host: &mut H,
        input: &mut I,
        trigger: &mut L,
        index: usize,
        condition: TrialCondition,
    ) -> Result<TrialRecord, SessionError>
    where
        H: PresentationHost,
        I: InputHost,
        L: TriggerLine,
    {
        let mut record = TrialRecord::pending(index, condition);

        let fixation_s = self.jittered(self.config.fixation_range_s);
        self.hold(host, input, fixation_s)?;

        // Early responses latch during the flicker itself; whether they cut
        // it short is the configured policy's call.
        let policy = self.config.response_policy;
        let allowed = allowed_keys(condition.expected);
        let mut latch: Option<ResponseOutcome> = None;

        trigger::fire(trigger, self.config.cue_trigger_code);
        let cue_scene = Scene {
            mask: &self.mask,
            fixation: true,
            probe: None,
        };
        let cue = self
            .scheduler
            .present(host, &cue_scene, &self.cue_plan, |now| {
                latching_poll(&mut *input, allowed, policy, &mut latch, now)
            })?;
        if cue.aborted {
            return Err(SessionError::Aborted);
        }
        record.dropped = cue.report;

        // A latched ends-stimulus response makes the probe moot.
        let probe_onset_ns = if latch.is_some() && policy == ResponsePolicy::EndsStimulus {
            None
        } else {
            trigger::fire(trigger, self.config.probe_trigger_code);
            let probe_scene = Scene {
                mask: &self.mask,
                fixation: true,
                probe: Some(condition.probe_side),
            };
            let probe = self
                .scheduler
                .present(host, &probe_scene, &self.probe_plan, |now| {
                    latching_poll(&mut *input, allowed, policy, &mut latch, now)
                })?;
            if probe.aborted {
                return Err(SessionError::Aborted);
            }
            record.dropped.absorb(probe.report, cue.frames_presented);
            probe.onset_ns
        };

        let outcome = match latch {
            Some(outcome) => outcome,
            None => await_response(
                input,
                &self.timer,
                allowed,
                Some(Duration::from_secs_f64(self.config.response_timeout_s)),
                Duration::from_secs_f64(self.config.response_poll_interval_s),
            )?,
        };

        record.response = outcome.code;
        record.timed_out = outcome.timed_out;
        record.correct = score(outcome.code, condition.expected);
        if !outcome.timed_out {
            // Reaction time runs from the probe's physical onset; a response
            // that predates the probe is anchored to cue onset instead.
            let origin = match probe_onset_ns {
                Some(probe) if outcome.timestamp_ns >= probe => Some(probe),
                _ => cue.onset_ns,
            };
            record.reaction_time_s = origin
                .filter(|&o| outcome.timestamp_ns >= o)
                .map(|o| (outcome.timestamp_ns - o) as f64 / 1e9);
        }

        if self.config.feedback_duration_s > 0.0 {
            self.hold(host, input, self.config.feedback_duration_s)?;
        }

        let intertrial_s = self.jittered(self.config.intertrial_range_s);
        self.wait(input, intertrial_s)?;

        Ok(record)
    }

    fn jittered(&mut self, (lo, hi): (f64, f64)) -> f64 {
        self.rng.random_range(lo..=hi)
    }

    /// Fixation-only hold driven through the scheduler so the screen keeps
    /// refreshing on cadence. Only the abort key is honored.
    fn hold<H, I>(&mut self, host: &mut H, input: &mut I, duration_s: f64) -> Result<(), SessionError>
    where
        H: PresentationHost,
        I: InputHost,
    {
        let plan = FramePlan::blank(self.clock.frame_count(duration_s));
        let scene = Scene {
            mask: &self.mask,
            fixation: true,
            probe: None,
        };
        let outcome = self
            .scheduler
            .present(host, &scene, &plan, |now| match poll_once(input, &[], now) {
                Ok(Poll::Abort) => FramePoll::Abort,
                Ok(_) => FramePoll::Continue,
                Err(err) => FramePoll::Fail(err),
            })?;
        if outcome.aborted {
            return Err(SessionError::Aborted);
        }
        Ok(())
    }

    /// Dark intertrial pause without presentation deadlines. Sleeps at most
    /// one refresh interval at a time so abort stays responsive.
    fn wait<I: InputHost>(&mut self, input: &mut I, duration_s: f64) -> Result<(), SessionError> {
        let duration = Duration::from_secs_f64(duration_s);
        let start = self.timer.now();
        loop {
            if let Poll::Abort = poll_once(input, &[], self.timer.now())? {
                return Err(SessionError::Aborted);
            }
            let elapsed = self.timer.elapsed(start);
            if elapsed >= duration {
                return Ok(());
            }
            self.timer.sleep((duration - elapsed).min(self.clock.interval()));
        }
    }
}

/// Per-frame input sample during a presentation. The first qualifying key
/// latches once with its observation timestamp; afterwards only abort is
/// still watched. Input failures surface as scheduler failures.
fn latching_poll<I: InputHost>(
    input: &mut I,
    allowed: &[Key],
    policy: ResponsePolicy,
    latch: &mut Option<ResponseOutcome>,
    now: u64,
) -> FramePoll {
    if latch.is_none() {
        match poll_once(input, allowed, now) {
            Ok(Poll::Abort) => return FramePoll::Abort,
            Ok(Poll::Response(outcome)) => {
                *latch = Some(outcome);
                if policy == ResponsePolicy::EndsStimulus {
                    return FramePoll::EndStimulus;
                }
            }
            Ok(Poll::None) => {}
            Err(err) => return FramePoll::Fail(err),
        }
    } else {
        match poll_once(input, &[], now) {
            Ok(Poll::Abort) => return FramePoll::Abort,
            Ok(_) => {}
            Err(err) => return FramePoll::Fail(err),
        }
    }
    FramePoll::Continue
}
