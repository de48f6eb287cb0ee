pub mod config;
pub mod response;
pub mod schedule;
pub mod session;
pub mod trial;
pub mod trigger;

pub use config::{ExperimentConfig, ResponsePolicy};
pub use response::{InputHost, Key, Poll, ResponseOutcome, await_response, poll_once};
pub use schedule::{FramePoll, FrameScheduler, PresentationOutcome, Scene, SchedulerState};
pub use session::{JsonFileSink, ResultSink, Session};
pub use trial::TrialRunner;
pub use trigger::{NullTrigger, TriggerLine};
