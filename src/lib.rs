// Library surface for the binary, headless integration tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod controller;
pub mod diff;
pub mod error;
pub mod history;
pub mod logging;
pub mod provider;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod sound;
pub mod stats;
pub mod text;
pub mod ui;

pub use error::{EngineError, Result};
