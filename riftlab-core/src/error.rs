use thiserror::Error;

/// Fatal configuration problems, caught at setup before any trial runs.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("refresh interval must be positive, got {0} s")]
    InvalidInterval(f64),
    #[error("duration must be positive, got {0} s")]
    InvalidDuration(f64),
    #[error("flicker frequency must be positive and finite, got {0} Hz")]
    InvalidFrequency(f64),
    #[error("intensity range is empty: min {min} > max {max}")]
    EmptyIntensityRange { min: f32, max: f32 },
    #[error("mask must span at least one pixel, got {0}")]
    InvalidMaskSize(u32),
    #[error("mask edge sigma must be positive, got {0}")]
    InvalidEdgeSigma(f32),
    #[error("trial table is empty")]
    EmptyTrialTable,
}

/// The display or input device became unavailable mid-session. Fatal;
/// takes the same release path as an abort.
#[derive(Debug, Error)]
#[error("device unavailable: {0}")]
pub struct DeviceError(pub String);

/// Terminal outcomes that surface past the trial orchestrator.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// Participant hit the abort key. Reported distinctly from failure.
    #[error("session aborted by participant")]
    Aborted,
}

impl SessionError {
    pub fn is_abort(&self) -> bool {
        matches!(self, SessionError::Aborted)
    }
}
