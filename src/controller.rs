//! The typing-test state machine.
//!
//! [`TestController`] owns one test at a time: the reference text, the typed
//! buffer, the session clock and its timers. Input events and timer pumps
//! mutate it; every visible change is pushed to a [`Presenter`] as a
//! [`RenderSnapshot`], and a finished test yields exactly one [`ResultRecord`].

use std::time::Instant;

use log::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{TestConfig, TestMode};
use crate::diff::{count_errors, diff, CharVerdict};
use crate::error::{EngineError, Result};
use crate::scheduler::{
    Scheduler, Timer, TimerKind, COUNTDOWN_PERIOD, LIVE_STATS_PERIOD, MIN_RENDER_SPACING,
};
use crate::session::{Phase, SessionState};
use crate::sound::{NullNotifier, SoundEvent, SoundNotifier};
use crate::stats::{self, LiveStats};
use crate::text::{ContentKind, ReferenceText};

/// Spaces inserted for a tab in code
pub const INDENT: &str = "    ";

/// Everything the presentation layer needs to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub phase: Phase,
    pub verdicts: Vec<CharVerdict>,
    pub live: LiveStats,
    pub progress_pct: u32,
}

/// Final outcome of a completed test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultRecord {
    pub wpm: u32,
    pub accuracy_pct: u32,
    pub elapsed_secs: f64,
    pub total_chars: usize,
    pub error_count: usize,
    pub consistency_pct: u32,
    pub mode: TestMode,
}

/// Receiver of render snapshots and results
pub trait Presenter {
    fn render(&mut self, snapshot: &RenderSnapshot);
    fn result(&mut self, record: &ResultRecord);
    fn content_unavailable(&mut self, _reason: &str) {}
}

/// Presenter that keeps the latest snapshot for a draw loop to pick up
#[derive(Debug, Default, Clone)]
pub struct SnapshotPresenter {
    pub latest: Option<RenderSnapshot>,
    pub renders: usize,
    pub results: Vec<ResultRecord>,
    pub unavailable: Option<String>,
}

impl Presenter for SnapshotPresenter {
    fn render(&mut self, snapshot: &RenderSnapshot) {
        self.latest = Some(snapshot.clone());
        self.renders += 1;
        self.unavailable = None;
    }

    fn result(&mut self, record: &ResultRecord) {
        self.results.push(*record);
    }

    fn content_unavailable(&mut self, reason: &str) {
        self.latest = None;
        self.unavailable = Some(reason.to_string());
    }
}

pub struct TestController<C: Clock, P: Presenter> {
    clock: C,
    presenter: P,
    sound: Box<dyn SoundNotifier>,
    scheduler: Scheduler,
    config: TestConfig,
    reference: Option<ReferenceText>,
    session: SessionState,
    live: LiveStats,
    result: Option<ResultRecord>,
    last_render: Option<Instant>,
}

impl<C: Clock, P: Presenter> TestController<C, P> {
    pub fn new(clock: C, presenter: P) -> Self {
        Self {
            clock,
            presenter,
            sound: Box::new(NullNotifier),
            scheduler: Scheduler::new(),
            config: TestConfig::default(),
            reference: None,
            session: SessionState::default(),
            live: LiveStats::default(),
            result: None,
            last_render: None,
        }
    }

    pub fn with_sound(mut self, sound: Box<dyn SoundNotifier>) -> Self {
        self.sound = sound;
        self
    }

    /// Loads a new test. A failed fetch or preparation is passed straight in:
    /// the controller then sits at idle with no content and reports it.
    pub fn configure(
        &mut self,
        config: TestConfig,
        reference: Result<ReferenceText>,
    ) -> Result<()> {
        if self.session.phase == Phase::Running {
            return Err(EngineError::InvalidTransition {
                action: "configure",
                phase: Phase::Running,
            });
        }

        self.config = config;
        match reference {
            Ok(reference) => {
                debug!(
                    "configured {} test: {} chars of {}",
                    config.mode,
                    reference.len(),
                    reference.kind()
                );
                self.reference = Some(reference);
                self.reset_session();
                self.request_render(self.clock.now());
                Ok(())
            }
            Err(err) => {
                let reason = match err {
                    EngineError::ContentUnavailable(reason) => reason,
                    other => other.to_string(),
                };
                warn!("content unavailable: {reason}");
                self.reference = None;
                self.reset_session();
                self.presenter.content_unavailable(&reason);
                Err(EngineError::ContentUnavailable(reason))
            }
        }
    }

    /// Back to a fresh idle test on the same text and config
    pub fn restart(&mut self) {
        debug!("restart from {}", self.session.phase);
        self.reset_session();
        if self.reference.is_some() {
            self.request_render(self.clock.now());
        }
    }

    /// The whole typed buffer after an edit. Ignored once completed.
    ///
    /// Timers that came due before this edit fire first, so a key arriving
    /// after the countdown ran out is dropped instead of extending the test.
    pub fn input_changed(&mut self, new_buffer: &str) {
        let Some(limit) = self.reference.as_ref().map(ReferenceText::len) else {
            return;
        };
        self.advance();
        if self.session.phase == Phase::Completed {
            return;
        }

        let now = self.clock.now();
        let prev_len = self.session.typed.len();
        self.session.typed.replace_clamped(new_buffer, limit);

        if self.session.phase == Phase::Idle {
            if self.session.typed.is_empty() {
                self.request_render(now);
                return;
            }
            self.start(now);
        }

        let Some(reference) = self.reference.as_ref() else {
            return;
        };
        let typed = self.session.typed.chars();
        self.session.error_count = count_errors(reference, typed);
        self.session.total_chars_typed = typed.len();

        let mistyped = typed.len() > prev_len
            && typed.last().copied() != reference.char_at(typed.len() - 1);
        let finished = typed.len() == reference.len();

        self.session.record_keystroke(now);
        self.sound.notify(if mistyped {
            SoundEvent::Error
        } else {
            SoundEvent::Keypress
        });
        self.refresh_live(now);

        if finished {
            self.complete_at(now);
        } else {
            self.request_render(now);
        }
    }

    /// Inserts four spaces at the cursor (code only)
    pub fn tab_pressed(&mut self) {
        if !self.accepts_code_edit() {
            return;
        }
        let (content, cursor) = self.session.typed.with_insert(INDENT);
        self.dispatch_edit(&content, cursor);
    }

    /// Removes one indent from the start of the current line (code only)
    pub fn back_tab_pressed(&mut self) {
        if !self.accepts_code_edit() {
            return;
        }
        let typed = &self.session.typed;
        let line = typed.current_line();
        if !line.starts_with(INDENT) {
            return;
        }

        let cursor = typed.cursor();
        let line_start = cursor - line.chars().count();
        let indent_len = INDENT.len();
        let chars = typed.chars();
        let content: String = chars[..line_start]
            .iter()
            .chain(&chars[line_start + indent_len..])
            .collect();
        self.dispatch_edit(&content, cursor - indent_len);
    }

    /// Newline plus, with auto-indent, the current line's leading whitespace (code only)
    pub fn enter_pressed(&mut self) {
        if !self.accepts_code_edit() {
            return;
        }
        let mut insert = String::from("\n");
        if self.config.auto_indent {
            insert.extend(
                self.session
                    .typed
                    .current_line()
                    .chars()
                    .take_while(|c| c.is_whitespace()),
            );
        }
        let (content, cursor) = self.session.typed.with_insert(&insert);
        self.dispatch_edit(&content, cursor);
    }

    /// Ends a running test and returns its result. A no-op in any other phase.
    pub fn complete(&mut self) -> Option<ResultRecord> {
        let now = self.clock.now();
        self.complete_at(now)
    }

    /// Fires every timer that has come due
    pub fn advance(&mut self) {
        let now = self.clock.now();
        while let Some(timer) = self.scheduler.pop_due(now) {
            self.fire(timer, now);
        }
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        let typed = self.session.typed.chars();
        let (verdicts, progress_pct) = match &self.reference {
            Some(reference) => (
                diff(reference, typed),
                (100.0 * typed.len() as f64 / reference.len() as f64).round() as u32,
            ),
            None => (Vec::new(), 0),
        };
        RenderSnapshot {
            phase: self.session.phase,
            verdicts,
            live: self.live,
            progress_pct,
        }
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn typed(&self) -> String {
        self.session.typed.as_string()
    }

    pub fn live_stats(&self) -> LiveStats {
        self.live
    }

    pub fn result(&self) -> Option<&ResultRecord> {
        self.result.as_ref()
    }

    pub fn reference(&self) -> Option<&ReferenceText> {
        self.reference.as_ref()
    }

    pub fn is_content_available(&self) -> bool {
        self.reference.is_some()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    fn accepts_code_edit(&self) -> bool {
        self.session.phase != Phase::Completed
            && self
                .reference
                .as_ref()
                .is_some_and(|r| r.kind() == ContentKind::Code)
    }

    fn dispatch_edit(&mut self, content: &str, cursor: usize) {
        self.input_changed(content);
        if self.session.phase != Phase::Completed {
            self.session.typed.set_cursor(cursor);
        }
    }

    fn reset_session(&mut self) {
        self.scheduler.bump_generation();
        self.session = SessionState::default();
        self.live = LiveStats::fresh(self.countdown_total());
        self.result = None;
        self.last_render = None;
    }

    fn countdown_total(&self) -> Option<u64> {
        self.config
            .mode
            .is_timed()
            .then_some(self.config.duration_secs)
    }

    fn start(&mut self, now: Instant) {
        if self.session.phase != Phase::Idle {
            return;
        }
        debug!("test started (generation {})", self.scheduler.generation());
        self.session.phase = Phase::Running;
        self.session.started_at = Some(now);
        if self.config.mode.is_timed() {
            self.scheduler
                .schedule_every(TimerKind::Countdown, now, COUNTDOWN_PERIOD);
        }
        self.scheduler
            .schedule_every(TimerKind::LiveStats, now, LIVE_STATS_PERIOD);
    }

    fn complete_at(&mut self, now: Instant) -> Option<ResultRecord> {
        if self.session.phase != Phase::Running {
            debug!("completion ignored in {} phase", self.session.phase);
            return None;
        }
        let reference_len = self.reference.as_ref().map_or(0, ReferenceText::len);

        self.session.phase = Phase::Completed;
        self.session.ended_at = Some(now);
        self.scheduler
            .cancel_all(&[TimerKind::Countdown, TimerKind::LiveStats]);

        let elapsed_secs = self.session.elapsed(now).as_secs_f64();
        let record = ResultRecord {
            wpm: stats::words_per_minute(&self.session.typed.as_string(), elapsed_secs),
            accuracy_pct: stats::accuracy(reference_len, self.session.error_count),
            elapsed_secs,
            total_chars: self.session.typed.len(),
            error_count: self.session.error_count,
            consistency_pct: self.session.timing.consistency(),
            mode: self.config.mode,
        };
        info!(
            "{} test complete: {} wpm, {}% acc, {:.1}s, {} errors, {}% consistency",
            record.mode,
            record.wpm,
            record.accuracy_pct,
            record.elapsed_secs,
            record.error_count,
            record.consistency_pct
        );

        self.result = Some(record);
        self.refresh_live(now);
        self.sound.notify(SoundEvent::Complete);
        self.presenter.result(&record);
        let render_at = self.clock.now().max(now);
        self.request_render(render_at);
        Some(record)
    }

    fn fire(&mut self, timer: Timer, now: Instant) {
        if timer.generation != self.scheduler.generation() {
            debug!("dropping stale {:?} timer", timer.kind);
            return;
        }
        match timer.kind {
            TimerKind::Countdown => {
                if self.session.phase != Phase::Running {
                    return;
                }
                let deadline = timer.due.min(now);
                self.refresh_live(deadline);
                if self.live.remaining_secs == Some(0) {
                    debug!("countdown expired");
                    self.complete_at(deadline);
                } else {
                    self.request_render(now);
                }
            }
            TimerKind::LiveStats => {
                if self.session.phase != Phase::Running {
                    return;
                }
                self.refresh_live(now);
                self.request_render(now);
            }
            TimerKind::Render => self.emit_render(now),
        }
    }

    fn refresh_live(&mut self, now: Instant) {
        let elapsed = self.session.elapsed(now);
        let elapsed_secs = elapsed.as_secs();
        let reference_len = self.reference.as_ref().map_or(0, ReferenceText::len);
        self.live = LiveStats {
            wpm: stats::words_per_minute(&self.session.typed.as_string(), elapsed.as_secs_f64()),
            accuracy_pct: stats::accuracy(reference_len, self.session.error_count),
            elapsed_secs,
            remaining_secs: self
                .countdown_total()
                .map(|total| total.saturating_sub(elapsed_secs)),
            total_chars: self.session.total_chars_typed,
            error_count: self.session.error_count,
            consistency_pct: self.session.timing.consistency(),
        };
    }

    /// Renders now, or defers to one pending render if the last was too recent
    fn request_render(&mut self, now: Instant) {
        match self.last_render {
            Some(last) if now.saturating_duration_since(last) < MIN_RENDER_SPACING => {
                if !self.scheduler.is_scheduled(TimerKind::Render) {
                    self.scheduler
                        .schedule_once(TimerKind::Render, last + MIN_RENDER_SPACING);
                }
            }
            _ => self.emit_render(now),
        }
    }

    fn emit_render(&mut self, now: Instant) {
        self.scheduler.cancel(TimerKind::Render);
        self.last_render = Some(now);
        let snapshot = self.snapshot();
        self.presenter.render(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use assert_matches::assert_matches;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn controller(
        text: &str,
        kind: ContentKind,
        config: TestConfig,
    ) -> (TestController<ManualClock, SnapshotPresenter>, ManualClock) {
        let clock = ManualClock::new();
        let mut ctl = TestController::new(clock.clone(), SnapshotPresenter::default());
        ctl.configure(config, ReferenceText::new(text, kind)).unwrap();
        (ctl, clock)
    }

    fn words_mode() -> TestConfig {
        TestConfig {
            mode: TestMode::Words,
            ..TestConfig::default()
        }
    }

    fn code_mode() -> TestConfig {
        TestConfig {
            mode: TestMode::Code,
            duration_secs: 60,
            ..TestConfig::default()
        }
    }

    /// Types `text` one char at a time, `step_ms` apart
    fn type_progressively(
        ctl: &mut TestController<ManualClock, SnapshotPresenter>,
        clock: &ManualClock,
        text: &str,
        step_ms: u64,
    ) {
        let mut buffer = String::new();
        for (i, c) in text.chars().enumerate() {
            if i > 0 {
                clock.advance_ms(step_ms);
                ctl.advance();
            }
            buffer.push(c);
            ctl.input_changed(&buffer);
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSound(Rc<RefCell<Vec<SoundEvent>>>);

    impl SoundNotifier for RecordingSound {
        fn notify(&mut self, event: SoundEvent) {
            self.0.borrow_mut().push(event);
        }
    }

    #[test]
    fn starts_idle_with_fresh_stats() {
        let (ctl, _) = controller("cat dog", ContentKind::Prose, TestConfig::default());
        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(ctl.live_stats(), LiveStats::fresh(Some(30)));
        assert_eq!(ctl.presenter().renders, 1);
    }

    #[test]
    fn first_char_starts_the_clock() {
        let (mut ctl, _) = controller("cat", ContentKind::Prose, words_mode());
        ctl.input_changed("c");
        assert_eq!(ctl.phase(), Phase::Running);
        assert!(ctl.session().started_at.is_some());
    }

    #[test]
    fn empty_input_does_not_start() {
        let (mut ctl, _) = controller("cat", ContentKind::Prose, words_mode());
        ctl.input_changed("");
        assert_eq!(ctl.phase(), Phase::Idle);
    }

    #[test]
    fn cat_dog_scenario() {
        let (mut ctl, clock) = controller("cat dog", ContentKind::Prose, words_mode());
        type_progressively(&mut ctl, &clock, "cat dog", 1000);

        assert_eq!(ctl.phase(), Phase::Completed);
        let record = *ctl.result().unwrap();
        assert!((record.elapsed_secs - 6.0).abs() < 1e-9);
        assert_eq!(record.wpm, 20);
        assert_eq!(record.accuracy_pct, 100);
        assert_eq!(record.error_count, 0);
        assert_eq!(record.total_chars, 7);
        assert_eq!(record.consistency_pct, 100);
        assert_eq!(record.mode, TestMode::Words);
    }

    #[test]
    fn one_error_scenario() {
        let (mut ctl, clock) = controller("abcde", ContentKind::Prose, words_mode());
        type_progressively(&mut ctl, &clock, "abXde", 200);

        let record = ctl.result().unwrap();
        assert_eq!(record.error_count, 1);
        assert_eq!(record.accuracy_pct, 80);
    }

    #[test]
    fn backspace_uncounts_corrected_errors() {
        let (mut ctl, _) = controller("abcde", ContentKind::Prose, words_mode());
        ctl.input_changed("a");
        ctl.input_changed("aX");
        assert_eq!(ctl.session().error_count, 1);
        ctl.input_changed("a");
        ctl.input_changed("ab");
        assert_eq!(ctl.session().error_count, 0);
        assert_eq!(ctl.live_stats().accuracy_pct, 100);
    }

    #[test]
    fn overflow_is_clamped() {
        let (mut ctl, _) = controller("abc", ContentKind::Prose, words_mode());
        ctl.input_changed("abcdefgh");
        assert_eq!(ctl.typed(), "abc");
        assert_eq!(ctl.snapshot().verdicts.len(), 3);
        assert_eq!(ctl.phase(), Phase::Completed);
    }

    #[test]
    fn complete_twice_yields_one_record() {
        let (mut ctl, _) = controller("abcdef", ContentKind::Prose, words_mode());
        ctl.input_changed("ab");
        assert!(ctl.complete().is_some());
        assert!(ctl.complete().is_none());
        assert_eq!(ctl.presenter().results.len(), 1);
    }

    #[test]
    fn complete_from_idle_is_noop() {
        let (mut ctl, _) = controller("abc", ContentKind::Prose, words_mode());
        assert!(ctl.complete().is_none());
        assert_eq!(ctl.phase(), Phase::Idle);
    }

    #[test]
    fn input_ignored_after_completion() {
        let (mut ctl, _) = controller("ab", ContentKind::Prose, words_mode());
        ctl.input_changed("ab");
        ctl.input_changed("a");
        assert_eq!(ctl.typed(), "ab");
        assert_eq!(ctl.phase(), Phase::Completed);
    }

    #[test]
    fn countdown_completes_after_duration() {
        let config = TestConfig {
            mode: TestMode::Time,
            duration_secs: 5,
            ..TestConfig::default()
        };
        let (mut ctl, clock) = controller("the quick brown fox", ContentKind::Prose, config);
        ctl.input_changed("the");

        for tick in 1..=4 {
            clock.advance_ms(1000);
            ctl.advance();
            assert_eq!(ctl.phase(), Phase::Running, "still running after tick {tick}");
            assert_eq!(ctl.live_stats().remaining_secs, Some(5 - tick));
        }
        clock.advance_ms(1000);
        ctl.advance();

        assert_eq!(ctl.phase(), Phase::Completed);
        let record = ctl.result().unwrap();
        assert_eq!(record.total_chars, 3);
        assert!((record.elapsed_secs - 5.0).abs() < 1e-9);
        assert_eq!(record.wpm, 12);
    }

    #[test]
    fn keys_after_expiry_are_dropped() {
        let config = TestConfig {
            mode: TestMode::Time,
            duration_secs: 2,
            ..TestConfig::default()
        };
        let (mut ctl, clock) = controller("abcdef", ContentKind::Prose, config);
        ctl.input_changed("a");

        // no advance() between expiry and the next keys
        clock.advance_ms(2500);
        ctl.input_changed("ab");
        ctl.input_changed("abc");
        ctl.advance();

        assert_eq!(ctl.phase(), Phase::Completed);
        assert_eq!(ctl.typed(), "a");
        let record = ctl.result().unwrap();
        assert_eq!(record.total_chars, 1);
        assert!((record.elapsed_secs - 2.0).abs() < 1e-9);
    }

    #[test]
    fn code_edit_after_expiry_is_dropped() {
        let config = TestConfig {
            mode: TestMode::Code,
            duration_secs: 1,
            ..TestConfig::default()
        };
        let (mut ctl, clock) = controller("if x:\n    y", ContentKind::Code, config);
        ctl.input_changed("i");
        clock.advance_ms(1200);
        ctl.tab_pressed();

        assert_eq!(ctl.phase(), Phase::Completed);
        assert_eq!(ctl.typed(), "i");
        assert_eq!(ctl.session().typed.cursor(), 1);
    }

    #[test]
    fn words_mode_has_no_countdown() {
        let (mut ctl, clock) = controller("abc", ContentKind::Prose, words_mode());
        ctl.input_changed("a");
        clock.advance_ms(120_000);
        ctl.advance();
        assert_eq!(ctl.phase(), Phase::Running);
        assert_eq!(ctl.live_stats().remaining_secs, None);
        assert_eq!(ctl.live_stats().elapsed_secs, 120);
    }

    #[test]
    fn timers_cancelled_on_completion() {
        let (mut ctl, _) = controller("ab", ContentKind::Prose, TestConfig::default());
        ctl.input_changed("a");
        assert!(ctl.scheduler.next_due().is_some());
        ctl.input_changed("ab");
        assert_eq!(ctl.phase(), Phase::Completed);
        // only a deferred render may remain
        assert!(!ctl.scheduler.is_scheduled(TimerKind::Countdown));
        assert!(!ctl.scheduler.is_scheduled(TimerKind::LiveStats));
    }

    #[test]
    fn completed_state_is_frozen_against_ticks() {
        let (mut ctl, clock) = controller("ab", ContentKind::Prose, TestConfig::default());
        ctl.input_changed("a");
        clock.advance_ms(500);
        ctl.input_changed("ab");
        let frozen = ctl.live_stats();
        clock.advance_ms(10_000);
        ctl.advance();
        assert_eq!(ctl.live_stats(), frozen);
        assert_eq!(ctl.session().elapsed(clock.now()).as_millis(), 500);
    }

    #[test]
    fn restart_resets_live_stats() {
        let (mut ctl, clock) = controller("abcdef", ContentKind::Prose, words_mode());
        type_progressively(&mut ctl, &clock, "aXc", 300);
        ctl.restart();

        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(ctl.typed(), "");
        let live = ctl.live_stats();
        assert_eq!(live.wpm, 0);
        assert_eq!(live.accuracy_pct, 100);
        assert_eq!(live.elapsed_secs, 0);
        assert_eq!(live.total_chars, 0);
        assert_eq!(live.error_count, 0);
        assert_eq!(live.consistency_pct, 100);
        assert!(ctl.session().timing.is_empty());
        assert_eq!(ctl.reference().unwrap().content(), "abcdef");
    }

    #[test]
    fn restart_after_completion_allows_new_run() {
        let (mut ctl, _) = controller("ab", ContentKind::Prose, words_mode());
        ctl.input_changed("ab");
        ctl.restart();
        assert!(ctl.result().is_none());
        ctl.input_changed("a");
        assert_eq!(ctl.phase(), Phase::Running);
    }

    #[test]
    fn stale_timer_from_previous_run_is_ignored() {
        let config = TestConfig {
            mode: TestMode::Time,
            duration_secs: 1,
            ..TestConfig::default()
        };
        let (mut ctl, clock) = controller("abcdef", ContentKind::Prose, config);
        ctl.input_changed("a");
        clock.advance_ms(600);
        ctl.restart();
        ctl.input_changed("a");
        // the first run's countdown would have expired here
        clock.advance_ms(500);
        ctl.advance();
        assert_eq!(ctl.phase(), Phase::Running);
        clock.advance_ms(500);
        ctl.advance();
        assert_eq!(ctl.phase(), Phase::Completed);
    }

    #[test]
    fn configure_rejected_while_running() {
        let (mut ctl, _) = controller("abc", ContentKind::Prose, words_mode());
        ctl.input_changed("a");
        let err = ctl
            .configure(words_mode(), ReferenceText::new("xyz", ContentKind::Prose))
            .unwrap_err();
        assert_matches!(
            err,
            EngineError::InvalidTransition {
                phase: Phase::Running,
                ..
            }
        );
        assert_eq!(ctl.reference().unwrap().content(), "abc");
    }

    #[test]
    fn configure_after_completion_loads_new_text() {
        let (mut ctl, _) = controller("ab", ContentKind::Prose, words_mode());
        ctl.input_changed("ab");
        ctl.configure(words_mode(), ReferenceText::new("xyz", ContentKind::Prose))
            .unwrap();
        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(ctl.reference().unwrap().content(), "xyz");
        assert!(ctl.result().is_none());
    }

    #[test]
    fn empty_text_is_content_unavailable() {
        let (mut ctl, _) = controller("ab", ContentKind::Prose, words_mode());
        let err = ctl
            .configure(words_mode(), ReferenceText::new("", ContentKind::Prose))
            .unwrap_err();
        assert_matches!(err, EngineError::ContentUnavailable(_));
        assert_eq!(ctl.phase(), Phase::Idle);
        assert!(!ctl.is_content_available());
        assert!(ctl.presenter().unavailable.is_some());

        ctl.input_changed("a");
        assert_eq!(ctl.phase(), Phase::Idle);
    }

    #[test]
    fn tab_inserts_four_spaces_in_code() {
        let (mut ctl, _) = controller("if x:\n    y", ContentKind::Code, code_mode());
        ctl.input_changed("if x:\n");
        ctl.tab_pressed();
        assert_eq!(ctl.typed(), "if x:\n    ");
        assert_eq!(ctl.session().error_count, 0);
    }

    #[test]
    fn tab_ignored_for_prose() {
        let (mut ctl, _) = controller("a    b", ContentKind::Prose, words_mode());
        ctl.input_changed("a");
        ctl.tab_pressed();
        assert_eq!(ctl.typed(), "a");
    }

    #[test]
    fn enter_copies_current_indent() {
        let code = "def f():\n    a = 1\n    return a";
        let (mut ctl, _) = controller(code, ContentKind::Code, code_mode());
        ctl.input_changed("def f():\n    a = 1");
        ctl.enter_pressed();
        assert_eq!(ctl.typed(), "def f():\n    a = 1\n    ");
        assert_eq!(ctl.session().error_count, 0);
    }

    #[test]
    fn enter_without_auto_indent() {
        let config = TestConfig {
            auto_indent: false,
            ..code_mode()
        };
        let (mut ctl, _) = controller("    a\n    b", ContentKind::Code, config);
        ctl.input_changed("    a");
        ctl.enter_pressed();
        assert_eq!(ctl.typed(), "    a\n");
    }

    #[test]
    fn back_tab_removes_one_indent() {
        let (mut ctl, _) = controller("x\n        y", ContentKind::Code, code_mode());
        ctl.input_changed("x\n        ");
        ctl.back_tab_pressed();
        assert_eq!(ctl.typed(), "x\n    ");
        assert_eq!(ctl.session().typed.cursor(), 6);

        ctl.input_changed("x\ny");
        ctl.back_tab_pressed();
        assert_eq!(ctl.typed(), "x\ny");
    }

    #[test]
    fn tab_can_complete_the_test() {
        let (mut ctl, _) = controller("a    ", ContentKind::Code, code_mode());
        ctl.input_changed("a");
        ctl.tab_pressed();
        assert_eq!(ctl.phase(), Phase::Completed);
    }

    #[test]
    fn timing_samples_after_first_keystroke() {
        let (mut ctl, clock) = controller("abcd", ContentKind::Prose, words_mode());
        ctl.input_changed("a");
        clock.advance_ms(50);
        ctl.input_changed("ab");
        clock.advance_ms(150);
        ctl.input_changed("abc");
        assert_eq!(ctl.session().timing.samples(), vec![50, 150]);
        assert!(ctl.live_stats().consistency_pct < 100);
    }

    #[test]
    fn sound_events_follow_input() {
        let sound = RecordingSound::default();
        let events = sound.0.clone();
        let clock = ManualClock::new();
        let mut ctl = TestController::new(clock, SnapshotPresenter::default())
            .with_sound(Box::new(sound));
        ctl.configure(words_mode(), ReferenceText::new("ab", ContentKind::Prose))
            .unwrap();

        ctl.input_changed("X");
        ctl.input_changed("");
        ctl.input_changed("a");
        ctl.input_changed("ab");

        assert_eq!(
            *events.borrow(),
            vec![
                SoundEvent::Error,
                SoundEvent::Keypress,
                SoundEvent::Keypress,
                SoundEvent::Keypress,
                SoundEvent::Complete
            ]
        );
    }

    #[test]
    fn renders_are_coalesced_not_dropped() {
        let (mut ctl, clock) = controller("abcdef", ContentKind::Prose, words_mode());
        clock.advance_ms(100);
        ctl.input_changed("a");
        let after_first = ctl.presenter().renders;

        ctl.input_changed("ab");
        ctl.input_changed("abc");
        assert_eq!(ctl.presenter().renders, after_first);

        clock.advance_ms(16);
        ctl.advance();
        assert_eq!(ctl.presenter().renders, after_first + 1);
        let latest = ctl.presenter().latest.as_ref().unwrap();
        assert_eq!(latest.live.total_chars, 3);
        assert_eq!(latest.progress_pct, 50);
        assert_eq!(latest.verdicts[3], CharVerdict::Current);
    }

    #[test]
    fn final_state_is_rendered() {
        let (mut ctl, clock) = controller("ab", ContentKind::Prose, words_mode());
        clock.advance_ms(100);
        ctl.input_changed("a");
        ctl.input_changed("ab");
        clock.advance_ms(16);
        ctl.advance();
        let latest = ctl.presenter().latest.as_ref().unwrap();
        assert_eq!(latest.phase, Phase::Completed);
        assert_eq!(latest.progress_pct, 100);
    }
}
