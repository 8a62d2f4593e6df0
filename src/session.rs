use std::time::{Duration, Instant};

use crate::stats::TimingWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Completed,
}

/// What the user has entered so far, with an insertion cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedBuffer {
    chars: Vec<char>,
    cursor: usize,
}

impl TypedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the content, dropping anything past `limit`.
    /// The cursor moves to the end.
    pub fn replace_clamped(&mut self, content: &str, limit: usize) {
        self.chars = content.chars().take(limit).collect();
        self.cursor = self.chars.len();
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }

    /// Content with `insert` spliced in at the cursor, and the cursor after it
    pub fn with_insert(&self, insert: &str) -> (String, usize) {
        let mut out: String = self.chars[..self.cursor].iter().collect();
        out.push_str(insert);
        let cursor = self.cursor + insert.chars().count();
        out.extend(&self.chars[self.cursor..]);
        (out, cursor)
    }

    /// The text between the last newline before the cursor and the cursor
    pub fn current_line(&self) -> String {
        let before = &self.chars[..self.cursor];
        let start = before
            .iter()
            .rposition(|c| *c == '\n')
            .map_or(0, |idx| idx + 1);
        before[start..].iter().collect()
    }

    pub(crate) fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.chars.len());
    }
}

/// Mutable per-test state, discarded on restart or a new text
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: Phase,
    pub started_at: Option<Instant>,
    pub ended_at: Option<Instant>,
    pub last_keystroke: Option<Instant>,
    pub typed: TypedBuffer,
    pub timing: TimingWindow,
    pub error_count: usize,
    pub total_chars_typed: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            started_at: None,
            ended_at: None,
            last_keystroke: None,
            typed: TypedBuffer::new(),
            timing: TimingWindow::new(),
            error_count: 0,
            total_chars_typed: 0,
        }
    }
}

impl SessionState {
    /// Time since start, frozen at completion
    pub fn elapsed(&self, now: Instant) -> Duration {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => now.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }

    /// Records a keystroke at `now`, returning the interval since the previous one
    pub fn record_keystroke(&mut self, now: Instant) -> Option<u64> {
        let interval = self
            .last_keystroke
            .map(|prev| now.saturating_duration_since(prev).as_millis() as u64);
        if let Some(ms) = interval {
            self.timing.push(ms);
        }
        self.last_keystroke = Some(now);
        interval
    }
}
