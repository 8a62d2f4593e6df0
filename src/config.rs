use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestMode {
    /// Countdown over prose
    Time,
    /// Fixed number of prose words, untimed
    Words,
    /// Countdown over source code
    Code,
}

impl TestMode {
    pub fn is_timed(&self) -> bool {
        matches!(self, TestMode::Time | TestMode::Code)
    }
}

/// Parameters of a single test, fixed while it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestConfig {
    pub mode: TestMode,
    pub duration_secs: u64,
    pub word_limit: usize,
    pub auto_indent: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            mode: TestMode::Time,
            duration_secs: 30,
            word_limit: 25,
            auto_indent: true,
        }
    }
}

/// Persisted user preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub mode: TestMode,
    pub duration_secs: u64,
    pub word_limit: usize,
    pub auto_indent: bool,
    pub sound: bool,
    pub include_numbers: bool,
    pub random: bool,
    pub category: String,
    pub code_language: String,
}

impl Default for Config {
    fn default() -> Self {
        let test = TestConfig::default();
        Self {
            mode: test.mode,
            duration_secs: test.duration_secs,
            word_limit: test.word_limit,
            auto_indent: test.auto_indent,
            sound: true,
            include_numbers: false,
            random: false,
            category: "tech".to_string(),
            code_language: "python".to_string(),
        }
    }
}

impl Config {
    pub fn test_config(&self) -> TestConfig {
        TestConfig {
            mode: self.mode,
            duration_secs: self.duration_secs,
            word_limit: self.word_limit,
            auto_indent: self.auto_indent,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = crate::app_dirs::AppDirs::config_path()
            .unwrap_or_else(|| PathBuf::from("keyra_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing or unreadable files fall back to defaults
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice::<Config>(&bytes).unwrap_or_else(|e| {
                log::warn!("ignoring malformed config {}: {e}", self.path.display());
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

/// Keeps `ProjectDirs` in one place for callers that want the raw dirs
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "keyra")
}
