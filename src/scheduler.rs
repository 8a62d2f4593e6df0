//! Generation-tagged timers for the session clock.
//!
//! Nothing here runs on its own: the owner pumps [`Scheduler::pop_due`] with
//! the current instant. Every timer records the generation it was registered
//! under so a callback can tell whether it belongs to the current test.

use std::time::{Duration, Instant};

/// Countdown / elapsed display refresh
pub const COUNTDOWN_PERIOD: Duration = Duration::from_millis(1000);
/// Live wpm and accuracy refresh
pub const LIVE_STATS_PERIOD: Duration = Duration::from_millis(100);
/// Minimum spacing between two emitted renders
pub const MIN_RENDER_SPACING: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Countdown,
    LiveStats,
    /// A render deferred by the spacing limit
    Render,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timer {
    pub kind: TimerKind,
    pub due: Instant,
    pub period: Option<Duration>,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    timers: Vec<Timer>,
    generation: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts a new generation and drops every pending timer
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.timers.clear();
        self.generation
    }

    /// Registers a periodic timer, replacing any pending timer of the same kind
    pub fn schedule_every(&mut self, kind: TimerKind, now: Instant, period: Duration) {
        self.insert(Timer {
            kind,
            due: now + period,
            period: Some(period),
            generation: self.generation,
        });
    }

    /// Registers a one-shot timer, replacing any pending timer of the same kind
    pub fn schedule_once(&mut self, kind: TimerKind, due: Instant) {
        self.insert(Timer {
            kind,
            due,
            period: None,
            generation: self.generation,
        });
    }

    fn insert(&mut self, timer: Timer) {
        self.cancel(timer.kind);
        self.timers.push(timer);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.timers.retain(|t| t.kind != kind);
    }

    pub fn cancel_all(&mut self, kinds: &[TimerKind]) {
        self.timers.retain(|t| !kinds.contains(&t.kind));
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|t| t.kind == kind)
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.due).min()
    }

    /// Takes the earliest timer due at or before `now`.
    /// Periodic timers are re-armed one period later; one-shots are removed.
    pub fn pop_due(&mut self, now: Instant) -> Option<Timer> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| t.due)
            .map(|(idx, _)| idx)?;

        let fired = self.timers[idx];
        match fired.period {
            Some(period) => self.timers[idx].due += period,
            None => {
                self.timers.swap_remove(idx);
            }
        }
        Some(fired)
    }
}
