use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::Rng;
use riftlab_core::{
    ColorMap, ColorTrack, DeviceError, FramePlan, FrameSequence, RefreshClock, SessionError,
    SessionResult, SetupError, StimulusMask, TrialCondition, TrialRecord,
};
use riftlab_render::PresentationHost;
use riftlab_timing::Timer;

use crate::config::ExperimentConfig;
use crate::response::InputHost;
use crate::trial::TrialRunner;
use crate::trigger::TriggerLine;

/// Where finished trials go. `append` runs after every trial so a crash or
/// abort loses at most the trial in flight; `finalize` writes the complete
/// session once.
pub trait ResultSink {
    fn append(&mut self, record: &TrialRecord) -> io::Result<()>;
    fn finalize(&mut self, result: &SessionResult) -> io::Result<()>;
}

/// JSON sink: one record per line in a `.partial.jsonl` sidecar as trials
/// finish, then the full session as pretty JSON at `path` on finalize.
pub struct JsonFileSink {
    path: PathBuf,
    partial: BufWriter<File>,
}

impl JsonFileSink {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let partial = BufWriter::new(File::create(path.with_extension("partial.jsonl"))?);
        Ok(Self { path, partial })
    }
}

impl ResultSink for JsonFileSink {
    fn append(&mut self, record: &TrialRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.partial, record)?;
        self.partial.write_all(b"\n")?;
        self.partial.flush()
    }

    fn finalize(&mut self, result: &SessionResult) -> io::Result<()> {
        self.partial.flush()?;
        let file = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(file, result)?;
        Ok(())
    }
}

/// One complete session: shared stimulus assets built once up front, then
/// the trial table run in order.
pub struct Session<T: Timer<Timestamp = u64>, R: Rng> {
    runner: TrialRunner<T, R>,
    conditions: Vec<TrialCondition>,
}

impl<T: Timer<Timestamp = u64>, R: Rng> Session<T, R> {
    /// Validates the configuration and precomputes everything trials share:
    /// the mask, the conditioned color map, and both frame plans. Per-frame
    /// work during presentation is lookups only.
    pub fn new(
        config: ExperimentConfig,
        clock: RefreshClock,
        timer: T,
        rng: R,
        conditions: Vec<TrialCondition>,
    ) -> Result<Self, SetupError> {
        config.validate()?;
        if conditions.is_empty() {
            return Err(SetupError::EmptyTrialTable);
        }

        let mask = StimulusMask::circular(config.stimulus_radius_px, config.edge_sigma)?;

        let background_gray =
            (config.background[0] + config.background[1] + config.background[2]) / 3.0;
        let map = ColorMap::from_endpoints(config.color_a, config.color_b, config.intensity)
            .conditioned(
                config.luminance_multiplier,
                config.saturation_level,
                background_gray,
            );

        let left = FrameSequence::build(
            config.cue_duration_s,
            &clock,
            config.left_frequency_hz,
            config.waveform,
        )?;
        let right = FrameSequence::build(
            config.cue_duration_s,
            &clock,
            config.right_frequency_hz,
            config.waveform,
        )?;
        let cue_plan = FramePlan::new(
            Some(ColorTrack::from_modulation(&left, &map)),
            Some(ColorTrack::from_modulation(&right, &map)),
        );
        let probe_plan = FramePlan::blank(clock.frame_count(config.probe_duration_s));

        tracing::info!(
            rate_hz = clock.rate_hz(),
            cue_frames = cue_plan.len(),
            probe_frames = probe_plan.len(),
            trials = conditions.len(),
            "session prepared"
        );

        let runner = TrialRunner::new(clock, timer, rng, config, mask, cue_plan, probe_plan);
        Ok(Self { runner, conditions })
    }

    pub fn trial_count(&self) -> usize {
        self.conditions.len()
    }

    /// Runs every trial in table order. Sink append failures are logged and
    /// tolerated; a trial failure finalizes whatever completed before the
    /// error propagates.
    pub fn run<H, I, L, S>(
        &mut self,
        host: &mut H,
        input: &mut I,
        trigger: &mut L,
        sink: &mut S,
    ) -> Result<SessionResult, SessionError>
    where
        H: PresentationHost,
        I: InputHost,
        L: TriggerLine,
        S: ResultSink,
    {
        let mut result = SessionResult::new();

        for index in 0..self.conditions.len() {
            let condition = self.conditions[index];
            match self.runner.run(host, input, trigger, index, condition) {
                Ok(record) => {
                    if let Err(err) = sink.append(&record) {
                        tracing::warn!(index, %err, "failed to append trial record");
                    }
                    result.push(record);
                }
                Err(err) => {
                    tracing::warn!(completed = result.len(), %err, "session ended early");
                    if let Err(sink_err) = sink.finalize(&result) {
                        tracing::warn!(%sink_err, "failed to finalize partial session");
                    }
                    return Err(err);
                }
            }
        }

        tracing::info!(
            trials = result.len(),
            dropped_frames = result.total_dropped_frames(),
            worst_overshoot_s = result.worst_overshoot_s(),
            "session complete"
        );
        sink.finalize(&result)
            .map_err(|err| DeviceError(format!("failed to write session results: {err}")))?;
        Ok(result)
    }
}
