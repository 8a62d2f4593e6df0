use thiserror::Error;

/// Errors surfaced by the typing engine and its collaborators
#[derive(Debug, Error)]
pub enum EngineError {
    /// No usable reference text: the provider failed or returned nothing typeable
    #[error("content unavailable: {0}")]
    ContentUnavailable(String),

    #[error("cannot {action} while a test is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: crate::session::Phase,
    },

    #[error("result storage failed: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
