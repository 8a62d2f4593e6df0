use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Event type consumed by the app loop
#[derive(Clone, Debug)]
pub enum KeyraEvent {
    Key(KeyEvent),
    Resize,
    /// No input arrived within the tick interval; timers get a chance to fire
    Tick,
}

/// Source of terminal events
pub trait KeyraEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<KeyraEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a background thread
pub struct CrosstermEventSource {
    rx: Receiver<KeyraEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // Release events would double every keystroke on some terminals
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    tx.send(KeyraEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(KeyraEvent::Resize),
                Ok(_) => Ok(()),
                Err(e) => {
                    log::error!("terminal event read failed: {e}");
                    break;
                }
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyraEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<KeyraEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-fed event source for headless tests
pub struct TestEventSource {
    rx: Receiver<KeyraEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<KeyraEvent>) -> Self {
        Self { rx }
    }
}

impl KeyraEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<KeyraEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the app one event or tick at a time
pub struct Runner<E: KeyraEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: KeyraEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to the tick interval; yields Tick when nothing arrived
    pub fn step(&self) -> KeyraEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                KeyraEvent::Tick
            }
        }
    }
}
