use std::path::PathBuf;

use crate::config::project_dirs;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/keyra`, or the platform data dir without a HOME
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(PathBuf::from(home).join(".local").join("state").join("keyra"))
        } else {
            project_dirs().map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("results.db"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("keyra.log"))
    }

    pub fn config_path() -> Option<PathBuf> {
        project_dirs().map(|proj_dirs| proj_dirs.config_dir().join("config.json"))
    }
}
