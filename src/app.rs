//! Terminal-facing application state: turns key presses into controller
//! calls, fetches texts, and files finished results away.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use webbrowser::Browser;

use crate::clock::Clock;
use crate::config::{Config, TestMode};
use crate::controller::{ResultRecord, SnapshotPresenter, TestController};
use crate::history::{HistoryEntry, ResultStore};
use crate::provider::{FetchParams, TextProvider};
use crate::session::Phase;
use crate::sound::SoundNotifier;
use crate::text::{self, ContentKind};

/// How many past results the results screen lists
pub const RECENT_RESULTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Typing,
    Results,
}

/// What the event loop should do after a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

pub struct App<C: Clock> {
    pub controller: TestController<C, SnapshotPresenter>,
    pub settings: Config,
    pub state: AppState,
    /// Best wpm for the current mode before the latest result was saved
    pub previous_best: Option<u32>,
    /// Latest stored results, newest first, including the one just finished
    pub recent: Vec<HistoryEntry>,
    provider: Box<dyn TextProvider>,
    history: Option<ResultStore>,
}

impl<C: Clock> App<C> {
    pub fn new(clock: C, settings: Config, provider: Box<dyn TextProvider>) -> Self {
        Self {
            controller: TestController::new(clock, SnapshotPresenter::default()),
            settings,
            state: AppState::Typing,
            previous_best: None,
            recent: Vec::new(),
            provider,
            history: None,
        }
    }

    pub fn with_history(mut self, history: ResultStore) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_sound(mut self, sound: Box<dyn SoundNotifier>) -> Self {
        self.controller = self.controller.with_sound(sound);
        self
    }

    pub fn content_kind(&self) -> ContentKind {
        match self.settings.mode {
            TestMode::Code => ContentKind::Code,
            TestMode::Time | TestMode::Words => ContentKind::Prose,
        }
    }

    fn fetch_params(&self) -> FetchParams {
        FetchParams {
            category: self.settings.category.clone(),
            code_language: self.settings.code_language.clone(),
            random: self.settings.random,
            duration_secs: self.settings.duration_secs,
        }
    }

    /// Fetches a fresh text and loads it. On failure the controller is left
    /// without content and the reason shows on screen.
    pub fn load_new(&mut self) {
        self.controller.restart();
        let kind = self.content_kind();
        let test_config = self.settings.test_config();
        let reference = self
            .provider
            .fetch_text(kind, &self.fetch_params())
            .and_then(|fetched| {
                text::prepare(
                    &fetched.text,
                    fetched.kind,
                    &test_config,
                    self.settings.include_numbers,
                )
            });
        // The reason is already with the presenter
        let _ = self.controller.configure(test_config, reference);
        self.state = AppState::Typing;
        self.previous_best = None;
        self.recent.clear();
    }

    /// Same text, fresh attempt
    pub fn restart(&mut self) {
        self.controller.restart();
        self.state = AppState::Typing;
        self.previous_best = None;
        self.recent.clear();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return KeyOutcome::Quit;
        }
        // A countdown that ran out before this key ends the test first
        self.tick();

        match key.code {
            KeyCode::Left => self.restart(),
            KeyCode::Right => self.load_new(),
            _ => match self.state {
                AppState::Typing => self.handle_typing_key(key),
                AppState::Results => {
                    if key.code == KeyCode::Char('t') {
                        self.share();
                    }
                }
            },
        }
        self.sync();
        KeyOutcome::Continue
    }

    fn handle_typing_key(&mut self, key: KeyEvent) {
        let code_content = self.content_kind() == ContentKind::Code;
        match key.code {
            KeyCode::Char(_)
                if key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {}
            KeyCode::Char(c) => self.type_str(&c.to_string()),
            KeyCode::Backspace => {
                let mut typed = self.controller.typed();
                typed.pop();
                self.controller.input_changed(&typed);
            }
            KeyCode::Tab => self.controller.tab_pressed(),
            KeyCode::BackTab => self.controller.back_tab_pressed(),
            KeyCode::Enter if code_content => self.controller.enter_pressed(),
            KeyCode::Enter => self.type_str("\n"),
            _ => {}
        }
    }

    fn type_str(&mut self, s: &str) {
        let (content, _) = self.controller.session().typed.with_insert(s);
        self.controller.input_changed(&content);
    }

    /// Lets due timers fire. Called on every tick of the event loop.
    pub fn tick(&mut self) {
        self.controller.advance();
        self.sync();
    }

    /// Moves to the results screen once the controller has finished a test
    fn sync(&mut self) {
        if self.state != AppState::Typing || self.controller.phase() != Phase::Completed {
            return;
        }
        self.state = AppState::Results;
        if let Some(record) = self.controller.result().copied() {
            self.record_result(&record);
        }
    }

    fn record_result(&mut self, record: &ResultRecord) {
        let kind = self.content_kind();
        let Some(history) = self.history.as_ref() else {
            return;
        };
        self.previous_best = history.best_wpm(record.mode).unwrap_or_else(|e| {
            log::warn!("could not read best wpm: {e}");
            None
        });
        if let Err(e) = history.save(record, kind) {
            log::warn!("could not save result: {e}");
        }
        self.recent = history.recent(RECENT_RESULTS).unwrap_or_else(|e| {
            log::warn!("could not read recent results: {e}");
            Vec::new()
        });
    }

    /// True when the latest result beats everything stored for its mode
    pub fn is_personal_best(&self) -> bool {
        match (self.controller.result(), self.history.is_some()) {
            (Some(record), true) => self.previous_best.map_or(true, |best| record.wpm > best),
            _ => false,
        }
    }

    pub fn share_url(&self) -> Option<String> {
        self.controller.result().map(|r| {
            format!(
                "https://twitter.com/intent/tweet?text={}%20wpm%20%2F%20{}%25%20acc%20%2F%20{}%25%20consistency%20on%20keyra",
                r.wpm, r.accuracy_pct, r.consistency_pct
            )
        })
    }

    fn share(&self) {
        if let Some(url) = self.share_url() {
            if Browser::is_available() {
                if let Err(e) = webbrowser::open(&url) {
                    log::warn!("could not open browser: {e}");
                }
            }
        }
    }
}
