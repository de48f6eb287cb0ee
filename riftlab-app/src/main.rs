mod host;
mod table;

use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use riftlab_core::{RefreshClock, SessionError};
use riftlab_experiment::{ExperimentConfig, JsonFileSink, NullTrigger, Session};
use riftlab_render::PresentationHost;
use riftlab_timing::{HighPrecisionTimer, Timer};
use tracing_subscriber::EnvFilter;

use host::DisplayHost;

const WARMUP_FRAMES: usize = 30;
const CALIBRATION_FRAMES: usize = 120;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    config.validate()?;
    let output_path = config.output_path.clone();

    let timer = HighPrecisionTimer::new();
    let (mut display, mut keyboard, monitor_rate_hz) =
        host::open(config.background, config.probe_radius_px, timer.clone())?;

    let clock = calibrate(&mut display, timer.clone(), monitor_rate_hz)?;

    let mut table_rng = rand::rng();
    let conditions = table::balanced(config.trial_count, &mut table_rng);

    let mut sink =
        JsonFileSink::create(&output_path).context("failed to create the results file")?;
    let mut session = Session::new(config, clock, timer, rand::rng(), conditions)?;

    match session.run(&mut display, &mut keyboard, &mut NullTrigger, &mut sink) {
        Ok(result) => {
            tracing::info!(
                trials = result.len(),
                dropped_frames = result.total_dropped_frames(),
                output = %output_path,
                "session finished"
            );
        }
        Err(SessionError::Aborted) => {
            tracing::warn!("session aborted by the operator; partial results kept");
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}

fn load_config() -> Result<ExperimentConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("failed to parse {path}"))
        }
        None => Ok(ExperimentConfig::default()),
    }
}

/// Measures the display's real refresh interval by presenting blank frames
/// and timing consecutive flips. The measured interval seeds the session
/// clock; the monitor's advertised rate is only a fallback.
fn calibrate(
    display: &mut DisplayHost,
    mut timer: HighPrecisionTimer,
    monitor_rate_hz: Option<f64>,
) -> Result<RefreshClock> {
    let mut last_ns = None;
    for frame in 0..WARMUP_FRAMES + CALIBRATION_FRAMES {
        display.clear()?;
        let info = display.present()?;
        if frame >= WARMUP_FRAMES {
            if let Some(last) = last_ns {
                timer.record_frame(Duration::from_nanos(info.timestamp_ns - last));
            }
        }
        last_ns = Some(info.timestamp_ns);
    }

    let stats = timer.calibration_stats();
    tracing::info!(
        average_ms = stats.average_frame_time_ns / 1e6,
        jitter_ms = stats.jitter_ns / 1e6,
        effective_fps = stats.effective_fps,
        "display calibration"
    );

    // Compositors without real vsync report sub-millisecond flips; fall
    // back to the advertised rate rather than scheduling against noise.
    let plausible = (1e6..=1e8).contains(&stats.average_frame_time_ns);
    if plausible {
        Ok(RefreshClock::from_interval(Duration::from_nanos(
            stats.average_frame_time_ns as u64,
        ))?)
    } else if let Some(rate) = monitor_rate_hz {
        tracing::warn!(rate, "measured interval implausible; using advertised rate");
        Ok(RefreshClock::from_rate_hz(rate)?)
    } else {
        anyhow::bail!("could not determine the display refresh interval");
    }
}
