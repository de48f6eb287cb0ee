use std::io;

/// Optional marker line (e.g. serial EEG triggers). Fire-and-forget: the
/// orchestrator never waits on it and never fails a trial because of it.
pub trait TriggerLine {
    fn send(&mut self, code: u8) -> io::Result<()>;
}

/// Default line for sessions without recording hardware.
pub struct NullTrigger;

impl TriggerLine for NullTrigger {
    fn send(&mut self, _code: u8) -> io::Result<()> {
        Ok(())
    }
}

/// Send a marker code, logging failure instead of propagating it.
pub fn fire<L: TriggerLine>(line: &mut L, code: u8) {
    if let Err(err) = line.send(code) {
        tracing::warn!(code, %err, "trigger line send failed");
    }
}
