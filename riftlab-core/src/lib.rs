pub mod clock;
pub mod error;
pub mod mask;
pub mod report;
pub mod sequence;
pub mod trial;

pub use clock::RefreshClock;
pub use error::{DeviceError, SessionError, SetupError};
pub use mask::StimulusMask;
pub use report::{DroppedFrameReport, FrameMiss};
pub use sequence::{ColorMap, ColorTrack, FramePlan, FrameSequence, IntensityRange, Rgb, Waveform};
pub use trial::{
    ExpectedAnswer, ResponseCode, SessionResult, Side, TrialCondition, TrialRecord, score,
};
