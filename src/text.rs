use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::config::{TestConfig, TestMode};
use crate::error::{EngineError, Result};

/// Whether a reference text is natural language or source code.
/// Only tab and indentation handling depend on it.
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
pub enum ContentKind {
    Prose,
    Code,
}

/// The immutable text a test is typed against
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceText {
    content: String,
    chars: Vec<char>,
    kind: ContentKind,
}

impl ReferenceText {
    pub fn new(content: impl Into<String>, kind: ContentKind) -> Result<Self> {
        let content = content.into();
        if content.is_empty() {
            return Err(EngineError::ContentUnavailable(
                "reference text is empty".to_string(),
            ));
        }
        let chars = content.chars().collect();
        Ok(Self {
            content,
            chars,
            kind,
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// Length in chars, never zero
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn char_at(&self, idx: usize) -> Option<char> {
        self.chars.get(idx).copied()
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Shapes raw provider text for a test: prose loses its digits unless numbers
/// are enabled, and words mode keeps only the first `word_limit` words.
/// Code is passed through untouched.
pub fn prepare(
    raw: &str,
    kind: ContentKind,
    config: &TestConfig,
    include_numbers: bool,
) -> Result<ReferenceText> {
    let text = match kind {
        ContentKind::Code => raw.to_string(),
        ContentKind::Prose => {
            let mut text = if include_numbers {
                raw.to_string()
            } else {
                raw.chars().filter(|c| !c.is_ascii_digit()).collect()
            };
            if config.mode == TestMode::Words {
                text = text
                    .split(' ')
                    .filter(|w| !w.is_empty())
                    .take(config.word_limit)
                    .join(" ");
            }
            text
        }
    };

    if text.trim().is_empty() {
        return Err(EngineError::ContentUnavailable(format!(
            "no typeable {kind} text after preparation"
        )));
    }
    ReferenceText::new(text, kind)
}
