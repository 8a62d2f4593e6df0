use env_logger::{Builder, Env, Target};
use std::fs::OpenOptions;
use std::path::Path;

use crate::app_dirs::AppDirs;

/// Environment variable holding the log filter, e.g. `KEYRA_LOG=debug`
pub const LOG_ENV: &str = "KEYRA_LOG";

/// Sends log output to the state dir log file. The terminal belongs to the
/// TUI, so without a writable file logging stays off.
pub fn init() {
    if let Some(path) = AppDirs::log_path() {
        if let Err(e) = init_with_file(&path) {
            eprintln!("logging disabled: {e}");
        }
    }
}

pub fn init_with_file(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    // A second init (e.g. from tests) is not an error worth reporting
    let _ = Builder::from_env(Env::default().filter_or(LOG_ENV, "info"))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init();
    Ok(())
}
