use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use keyra::{
    app::{App, KeyOutcome},
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, FileConfigStore, TestMode},
    history::ResultStore,
    provider::{BundledTextProvider, CustomTextProvider, TextProvider},
    runtime::{CrosstermEventSource, FixedTicker, KeyraEvent, Runner},
    sound::BellNotifier,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    time::Duration,
};

/// Frame pacing for the event loop; timers are checked at least this often
const TICK_RATE_MS: u64 = 16;

/// terminal typing test with live wpm, accuracy and rhythm consistency
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// test mode: time, words or code
    #[clap(short, long)]
    mode: Option<TestMode>,

    /// number of seconds to run a timed test
    #[clap(short, long)]
    secs: Option<u64>,

    /// number of words in a words test
    #[clap(short, long)]
    words: Option<usize>,

    /// prose category: tech, science or philosophy
    #[clap(short, long)]
    category: Option<String>,

    /// language for code tests: python, javascript, java or rust
    #[clap(short = 'l', long)]
    code_language: Option<String>,

    /// use generated text instead of bundled passages
    #[clap(long)]
    random: bool,

    /// keep digits in prose
    #[clap(long)]
    numbers: bool,

    /// do not carry indentation over on enter in code tests
    #[clap(long)]
    no_auto_indent: bool,

    /// silence the terminal bell
    #[clap(long)]
    no_sound: bool,

    /// custom prompt to use
    #[clap(short, long)]
    prompt: Option<String>,
}

impl Cli {
    /// Flags given on the command line win over the stored config
    fn apply(&self, mut config: Config) -> Config {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(secs) = self.secs {
            config.duration_secs = secs.max(1);
        }
        if let Some(words) = self.words {
            config.word_limit = words.max(1);
        }
        if let Some(category) = &self.category {
            config.category = category.clone();
        }
        if let Some(language) = &self.code_language {
            config.code_language = language.clone();
        }
        if self.random {
            config.random = true;
        }
        if self.numbers {
            config.include_numbers = true;
        }
        if self.no_auto_indent {
            config.auto_indent = false;
        }
        if self.no_sound {
            config.sound = false;
        }
        config
    }

    /// Rejects a category or code language the bundled texts don't have
    fn check_choices(&self, bundled: &BundledTextProvider) -> Result<(), String> {
        fn check(what: &str, given: Option<&String>, known: Vec<&str>) -> Result<(), String> {
            match given {
                Some(given) if !known.contains(&given.as_str()) => Err(format!(
                    "unknown {what} '{given}' (expected one of: {})",
                    known.join(", ")
                )),
                _ => Ok(()),
            }
        }
        check("category", self.category.as_ref(), bundled.categories())?;
        check(
            "code language",
            self.code_language.as_ref(),
            bundled.code_languages(),
        )
    }

    fn provider(&self) -> Result<Box<dyn TextProvider>, Box<dyn Error>> {
        let bundled = BundledTextProvider::new()?;
        self.check_choices(&bundled)?;
        Ok(match &self.prompt {
            Some(prompt) => Box::new(CustomTextProvider::new(prompt.clone())),
            None => Box::new(bundled),
        })
    }
}

fn build_app(cli: &Cli, store: &dyn ConfigStore) -> Result<App<SystemClock>, Box<dyn Error>> {
    let provider = cli.provider()?;
    let settings = cli.apply(store.load());
    if let Err(e) = store.save(&settings) {
        log::warn!("could not save config: {e}");
    }

    let mut app = App::new(SystemClock, settings.clone(), provider);
    match ResultStore::open_default() {
        Ok(history) => app = app.with_history(history),
        Err(e) => log::warn!("history disabled: {e}"),
    }
    if settings.sound {
        app = app.with_sound(Box::new(BellNotifier::stdout()));
    }
    app.load_new();
    Ok(app)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    keyra::logging::init();
    let mut app = build_app(&cli, &FileConfigStore::new())?;
    log::info!("starting {} test", app.settings.mode);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn start_tui<B: Backend, C: Clock>(
    terminal: &mut Terminal<B>,
    app: &mut App<C>,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut renders_seen = 0;

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        let redraw = match runner.step() {
            KeyraEvent::Tick => {
                app.tick();
                false
            }
            KeyraEvent::Resize => true,
            KeyraEvent::Key(key) => {
                if app.handle_key(key) == KeyOutcome::Quit {
                    break;
                }
                true
            }
        };

        // The controller decides when a frame is due; keys and resizes always redraw
        let renders = app.controller.presenter().renders;
        if redraw || renders != renders_seen {
            renders_seen = renders;
            terminal.draw(|f| f.render_widget(&*app, f.area()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cli_defaults_leave_config_alone() {
        let cli = Cli::parse_from(["keyra"]);
        assert_eq!(cli.apply(Config::default()), Config::default());
        assert!(cli.prompt.is_none());
    }

    #[test]
    fn cli_mode_and_secs() {
        let cli = Cli::parse_from(["keyra", "-m", "code", "-s", "60", "-l", "rust"]);
        let config = cli.apply(Config::default());
        assert_eq!(config.mode, TestMode::Code);
        assert_eq!(config.duration_secs, 60);
        assert_eq!(config.code_language, "rust");
    }

    #[test]
    fn cli_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["keyra", "--mode", "marathon"]).is_err());
    }

    #[test]
    fn cli_flags_override_stored_config() {
        let stored = Config {
            mode: TestMode::Words,
            word_limit: 10,
            category: "science".into(),
            ..Config::default()
        };
        let cli = Cli::parse_from([
            "keyra",
            "-w",
            "40",
            "--no-sound",
            "--no-auto-indent",
            "--numbers",
            "--random",
        ]);
        let config = cli.apply(stored);
        assert_eq!(config.mode, TestMode::Words);
        assert_eq!(config.word_limit, 40);
        assert_eq!(config.category, "science");
        assert!(!config.sound);
        assert!(!config.auto_indent);
        assert!(config.include_numbers);
        assert!(config.random);
    }

    #[test]
    fn zero_secs_is_raised_to_one() {
        let cli = Cli::parse_from(["keyra", "-s", "0"]);
        assert_eq!(cli.apply(Config::default()).duration_secs, 1);
    }

    #[test]
    fn build_app_persists_merged_settings() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cli = Cli::parse_from(["keyra", "-m", "words", "-w", "5", "--no-sound"]);

        let app = build_app(&cli, &store).unwrap();
        assert!(app.controller.is_content_available());
        assert_eq!(app.controller.reference().unwrap().word_count(), 5);

        let saved = store.load();
        assert_eq!(saved.mode, TestMode::Words);
        assert_eq!(saved.word_limit, 5);
    }

    #[test]
    fn unknown_category_or_language_is_rejected() {
        let bundled = BundledTextProvider::new().unwrap();

        let err = Cli::parse_from(["keyra", "-c", "cooking"])
            .check_choices(&bundled)
            .unwrap_err();
        assert!(err.contains("unknown category 'cooking'"));
        assert!(err.contains("science"));

        let err = Cli::parse_from(["keyra", "-l", "cobol"])
            .check_choices(&bundled)
            .unwrap_err();
        assert!(err.contains("unknown code language 'cobol'"));

        assert!(Cli::parse_from(["keyra", "-c", "science", "-l", "java"])
            .check_choices(&bundled)
            .is_ok());
        assert!(Cli::parse_from(["keyra"]).check_choices(&bundled).is_ok());
    }

    #[test]
    fn rejected_flags_are_not_saved() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cli = Cli::parse_from(["keyra", "-l", "cobol", "--no-sound"]);

        assert!(build_app(&cli, &store).is_err());
        assert_eq!(store.load().code_language, Config::default().code_language);
    }

    #[test]
    fn custom_prompt_is_used() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cli = Cli::parse_from(["keyra", "-m", "words", "-p", "just this", "--no-sound"]);

        let app = build_app(&cli, &store).unwrap();
        assert_eq!(app.controller.reference().unwrap().content(), "just this");
    }
}
