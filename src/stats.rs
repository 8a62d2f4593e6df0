use std::collections::VecDeque;

/// Number of inter-keystroke intervals kept for the consistency score
pub const TIMING_WINDOW: usize = 10;

/// Bounded window of the most recent inter-keystroke intervals in ms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingWindow {
    samples: VecDeque<u64>,
}

impl TimingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interval_ms: u64) {
        if self.samples.len() == TIMING_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(interval_ms);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> Vec<u64> {
        self.samples.iter().copied().collect()
    }

    pub fn consistency(&self) -> u32 {
        consistency(&self.samples())
    }
}

/// Stats shown while a test is in progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveStats {
    pub wpm: u32,
    pub accuracy_pct: u32,
    pub elapsed_secs: u64,
    /// Seconds left on the countdown in timed modes
    pub remaining_secs: Option<u64>,
    pub total_chars: usize,
    pub error_count: usize,
    pub consistency_pct: u32,
}

impl LiveStats {
    /// Zeroed stats for a session that has not started
    pub fn fresh(remaining_secs: Option<u64>) -> Self {
        Self {
            wpm: 0,
            accuracy_pct: 100,
            elapsed_secs: 0,
            remaining_secs,
            total_chars: 0,
            error_count: 0,
            consistency_pct: 100,
        }
    }

    /// The countdown when there is one, elapsed time otherwise
    pub fn elapsed_or_remaining_secs(&self) -> u64 {
        self.remaining_secs.unwrap_or(self.elapsed_secs)
    }
}

impl Default for LiveStats {
    fn default() -> Self {
        Self::fresh(None)
    }
}

/// Words are whitespace-delimited tokens of what was typed, not of the reference.
pub fn words_per_minute(typed: &str, elapsed_secs: f64) -> u32 {
    if elapsed_secs <= 0.0 {
        return 0;
    }
    let words = typed.split_whitespace().count() as f64;
    (words / (elapsed_secs / 60.0)).round() as u32
}

pub fn accuracy(total_reference_chars: usize, error_count: usize) -> u32 {
    if total_reference_chars == 0 {
        return 100;
    }
    let correct = total_reference_chars.saturating_sub(error_count) as f64;
    (100.0 * correct / total_reference_chars as f64)
        .round()
        .clamp(0.0, 100.0) as u32
}

/// Inverse coefficient of variation of the intervals, as a 0..=100 score.
///
/// Fewer than two samples score 100: there is no rhythm to judge yet.
pub fn consistency(samples_ms: &[u64]) -> u32 {
    if samples_ms.len() < 2 {
        return 100;
    }
    let data: Vec<f64> = samples_ms.iter().map(|s| *s as f64).collect();
    match (mean(&data), std_dev(&data)) {
        (Some(m), Some(sd)) if m > 0.0 => (100.0 - 100.0 * sd / m).round().max(0.0) as u32,
        // all intervals zero: perfectly even
        _ => 100,
    }
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = m - *value;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;
    Some(variance.sqrt())
}
