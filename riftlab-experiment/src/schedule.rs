use std::time::Duration;

use riftlab_core::{DeviceError, DroppedFrameReport, FramePlan, RefreshClock, Side, StimulusMask};
use riftlab_render::PresentationHost;
use riftlab_timing::Timer;

/// Scheduler lifecycle. `Presenting(i)` names the frame currently being
/// drawn and flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed,
    Presenting(usize),
    Done,
    Cancelled,
}

/// What the cooperative per-frame poll tells the scheduler. The poll runs
/// exactly once per frame iteration, so cancellation latency is bounded by
/// one frame interval.
pub enum FramePoll {
    Continue,
    /// A qualifying response latched under an ends-stimulus policy.
    EndStimulus,
    Abort,
    /// The input device failed mid-presentation.
    Fail(DeviceError),
}

/// What drawing a frame consists of, besides the per-frame tints.
pub struct Scene<'a> {
    pub mask: &'a StimulusMask,
    pub fixation: bool,
    pub probe: Option<Side>,
}

/// Result of presenting one frame plan.
#[derive(Debug, Clone)]
pub struct PresentationOutcome {
    /// Actual presentation timestamp of the first frame: the physical
    /// onset event all reaction times are measured from.
    pub onset_ns: Option<u64>,
    pub frames_presented: usize,
    pub report: DroppedFrameReport,
    pub aborted: bool,
    pub ended_early: bool,
}

/// Drives a frame plan against the refresh clock with minimal phase error.
///
/// Deadlines are anchored to the first frame's actual presentation
/// timestamp: `deadline[i] = onset + i * interval`. They are never chained
/// to observed completion times, so per-frame jitter cannot accumulate. A
/// missed deadline is telemetry only; the next frame keeps its
/// already-computed deadline with no catch-up and no skipping.
pub struct FrameScheduler<T: Timer> {
    clock: RefreshClock,
    timer: T,
    miss_fraction: f64,
    state: SchedulerState,
}

impl<T: Timer<Timestamp = u64>> FrameScheduler<T> {
    pub fn new(clock: RefreshClock, timer: T, miss_fraction: f64) -> Self {
        Self {
            clock,
            timer,
            miss_fraction,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn present<H, F>(
        &mut self,
        host: &mut H,
        scene: &Scene<'_>,
        plan: &FramePlan,
        mut poll: F,
    ) -> Result<PresentationOutcome, DeviceError>
    where
        H: PresentationHost,
        F: FnMut(u64) -> FramePoll,
    {
        self.state = SchedulerState::Armed;

        let mut outcome = PresentationOutcome {
            onset_ns: None,
            frames_presented: 0,
            report: DroppedFrameReport::new(),
            aborted: false,
            ended_early: false,
        };

        let miss_ns = self.clock.miss_threshold(self.miss_fraction).as_nanos() as u64;
        let grace_ns = self.clock.half_interval().as_nanos() as u64;
        let mut last_present_ns: Option<u64> = None;

        for frame in 0..plan.len() {
            // Abort is sampled at every frame boundary, before any work for
            // the frame is submitted.
            match poll(self.timer.now()) {
                FramePoll::Continue => {}
                FramePoll::EndStimulus => {
                    outcome.ended_early = true;
                    self.state = SchedulerState::Done;
                    return Ok(outcome);
                }
                FramePoll::Abort => {
                    outcome.aborted = true;
                    self.state = SchedulerState::Cancelled;
                    return Ok(outcome);
                }
                FramePoll::Fail(err) => {
                    self.state = SchedulerState::Cancelled;
                    return Err(err);
                }
            }

            self.state = SchedulerState::Presenting(frame);

            host.clear()?;
            if scene.fixation {
                host.draw_fixation()?;
            }
            for side in [Side::Left, Side::Right] {
                if let Some(tint) = plan.tint(side, frame) {
                    host.draw(host.placement(side), scene.mask, tint)?;
                }
            }
            if let Some(side) = scene.probe {
                host.draw_probe(host.placement(side))?;
            }

            let info = match outcome.onset_ns {
                None => {
                    // Start: the first frame's actual timestamp anchors
                    // every later deadline.
                    let info = host.present()?;
                    outcome.onset_ns = Some(info.timestamp_ns);
                    info
                }
                Some(origin) => {
                    let deadline = self.clock.deadline_ns(origin, frame);
                    // Request presentation no earlier than half an interval
                    // before the deadline, so an early swap does not stall
                    // for a whole extra refresh.
                    let request_at = deadline.saturating_sub(grace_ns);
                    let now = self.timer.now();
                    if now < request_at {
                        self.timer.sleep(Duration::from_nanos(request_at - now));
                    }
                    let info = host.present()?;
                    if info.timestamp_ns > deadline + miss_ns {
                        outcome
                            .report
                            .record(frame, (info.timestamp_ns - deadline) as f64 / 1e9);
                    }
                    info
                }
            };

            if let Some(last) = last_present_ns {
                self.timer
                    .record_frame(Duration::from_nanos(info.timestamp_ns.saturating_sub(last)));
            }
            last_present_ns = Some(info.timestamp_ns);
            outcome.frames_presented += 1;
        }

        self.state = SchedulerState::Done;
        Ok(outcome)
    }
}
