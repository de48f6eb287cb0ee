use std::time::Duration;

use riftlab_core::{DeviceError, ExpectedAnswer, ResponseCode, SessionError};
use riftlab_timing::Timer;

/// Keys the collector samples. Mapping to physical keys is the input
/// host's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Same,
    Different,
    Abort,
}

/// Point-in-time input sampling: the core never consumes key events, only
/// "is this key down right now".
pub trait InputHost {
    fn is_down(&mut self, key: Key) -> Result<bool, DeviceError>;
}

fn code_for(key: Key) -> ResponseCode {
    match key {
        Key::Left => ResponseCode::Left,
        Key::Right => ResponseCode::Right,
        Key::Same => ResponseCode::Same,
        Key::Different => ResponseCode::Different,
        Key::Abort => ResponseCode::None,
    }
}

/// Allowed-key set for a condition's answer category, in priority order.
pub fn allowed_keys(expected: ExpectedAnswer) -> &'static [Key] {
    match expected {
        ExpectedAnswer::Side(_) => &[Key::Left, Key::Right],
        ExpectedAnswer::Match(_) => &[Key::Same, Key::Different],
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseOutcome {
    pub code: ResponseCode,
    pub timestamp_ns: u64,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Poll {
    None,
    Response(ResponseOutcome),
    Abort,
}

/// One non-blocking sample of the allowed set. The abort key is checked
/// first in every call; otherwise keys are scanned in the slice's fixed
/// priority order and the first one down wins, which keeps simultaneous
/// key-down ties deterministic.
pub fn poll_once<I: InputHost>(
    input: &mut I,
    allowed: &[Key],
    now_ns: u64,
) -> Result<Poll, DeviceError> {
    if input.is_down(Key::Abort)? {
        return Ok(Poll::Abort);
    }
    for &key in allowed {
        if input.is_down(key)? {
            return Ok(Poll::Response(ResponseOutcome {
                code: code_for(key),
                timestamp_ns: now_ns,
                timed_out: false,
            }));
        }
    }
    Ok(Poll::None)
}

/// Dedicated response window: blocks until a qualifying key is observed or
/// the timeout elapses. There is no presentation deadline to honor here, so
/// the loop samples at `poll_interval` granularity; abort is re-checked on
/// every iteration.
pub fn await_response<I, T>(
    input: &mut I,
    timer: &T,
    allowed: &[Key],
    timeout: Option<Duration>,
    poll_interval: Duration,
) -> Result<ResponseOutcome, SessionError>
where
    I: InputHost,
    T: Timer<Timestamp = u64>,
{
    let start = timer.now();
    let deadline_ns = timeout.map(|t| start + t.as_nanos() as u64);

    loop {
        let now = timer.now();
        match poll_once(input, allowed, now)? {
            Poll::Abort => return Err(SessionError::Aborted),
            Poll::Response(outcome) => return Ok(outcome),
            Poll::None => {}
        }
        if let Some(deadline) = deadline_ns {
            if now >= deadline {
                return Ok(ResponseOutcome {
                    code: ResponseCode::None,
                    timestamp_ns: now,
                    timed_out: true,
                });
            }
        }
        timer.sleep(poll_interval);
    }
}
