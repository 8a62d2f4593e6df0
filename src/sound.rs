use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SoundEvent {
    Keypress,
    Error,
    Complete,
}

/// Fire-and-forget audio cue. The engine never waits on or inspects the outcome.
pub trait SoundNotifier {
    fn notify(&mut self, event: SoundEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl SoundNotifier for NullNotifier {
    fn notify(&mut self, _event: SoundEvent) {}
}

/// Rings the terminal bell on mistakes and at the end of a test
pub struct BellNotifier<W: Write> {
    out: W,
}

impl BellNotifier<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> BellNotifier<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SoundNotifier for BellNotifier<W> {
    fn notify(&mut self, event: SoundEvent) {
        if matches!(event, SoundEvent::Error | SoundEvent::Complete) {
            let _ = self.out.write_all(b"\x07").and_then(|_| self.out.flush());
        }
    }
}
