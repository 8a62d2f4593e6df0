use cgisf_lib::cgisf;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::text::ContentKind;

static TEXT_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/texts");

/// What to ask a provider for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub category: String,
    pub code_language: String,
    pub random: bool,
    /// Longer tests get longer texts
    pub duration_secs: u64,
}

impl Default for FetchParams {
    fn default() -> Self {
        Self {
            category: "tech".to_string(),
            code_language: "python".to_string(),
            random: false,
            duration_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedText {
    pub text: String,
    pub kind: ContentKind,
}

/// Source of reference texts. Failing to produce one is `ContentUnavailable`;
/// retrying is up to the caller.
pub trait TextProvider {
    fn fetch_text(&self, kind: ContentKind, params: &FetchParams) -> Result<FetchedText>;
}

#[derive(Deserialize, Debug)]
struct ProseCorpus {
    categories: HashMap<String, Vec<String>>,
}

#[derive(Deserialize, Debug)]
struct CodeCorpus {
    languages: HashMap<String, Vec<String>>,
}

/// Passages and snippets compiled into the binary
#[derive(Debug)]
pub struct BundledTextProvider {
    prose: HashMap<String, Vec<String>>,
    code: HashMap<String, Vec<String>>,
}

const FALLBACK_CODE_LANGUAGE: &str = "python";

impl BundledTextProvider {
    pub fn new() -> Result<Self> {
        let prose: ProseCorpus = read_corpus("prose.json")?;
        let code: CodeCorpus = read_corpus("code.json")?;
        Ok(Self {
            prose: prose.categories,
            code: code.languages,
        })
    }

    pub fn categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.prose.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn code_languages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.code.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn fetch_prose(&self, params: &FetchParams) -> Result<String> {
        if params.random {
            return Ok(random_prose(random_sentence_count(params.duration_secs)));
        }
        let passages = self.prose.get(&params.category).ok_or_else(|| {
            EngineError::ContentUnavailable(format!("unknown category '{}'", params.category))
        })?;
        let count = passage_count(ContentKind::Prose, params.duration_secs);
        Ok(sample(passages, count).join(" "))
    }

    fn fetch_code(&self, params: &FetchParams) -> Result<String> {
        let count = passage_count(ContentKind::Code, params.duration_secs);
        let language = if self.code.contains_key(&params.code_language) {
            params.code_language.as_str()
        } else {
            log::debug!(
                "no snippets for '{}', using {FALLBACK_CODE_LANGUAGE}",
                params.code_language
            );
            FALLBACK_CODE_LANGUAGE
        };

        if params.random {
            let snippets: Vec<String> = (0..count).map(|_| random_snippet(language)).collect();
            return Ok(snippets.join("\n\n"));
        }
        let snippets = self.code.get(language).ok_or_else(|| {
            EngineError::ContentUnavailable(format!("no code snippets for '{language}'"))
        })?;
        Ok(sample(snippets, count).join("\n\n"))
    }
}

impl TextProvider for BundledTextProvider {
    fn fetch_text(&self, kind: ContentKind, params: &FetchParams) -> Result<FetchedText> {
        let text = match kind {
            ContentKind::Prose => self.fetch_prose(params)?,
            ContentKind::Code => self.fetch_code(params)?,
        };
        if text.trim().is_empty() {
            return Err(EngineError::ContentUnavailable(format!(
                "provider returned no {kind} text"
            )));
        }
        Ok(FetchedText { text, kind })
    }
}

/// A fixed user-supplied prompt
#[derive(Debug, Clone)]
pub struct CustomTextProvider {
    text: String,
}

impl CustomTextProvider {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TextProvider for CustomTextProvider {
    fn fetch_text(&self, kind: ContentKind, _params: &FetchParams) -> Result<FetchedText> {
        if self.text.is_empty() {
            return Err(EngineError::ContentUnavailable(
                "custom prompt is empty".to_string(),
            ));
        }
        Ok(FetchedText {
            text: self.text.clone(),
            kind,
        })
    }
}

fn read_corpus<T: for<'de> Deserialize<'de>>(file_name: &str) -> Result<T> {
    let contents = TEXT_DIR
        .get_file(file_name)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| {
            EngineError::ContentUnavailable(format!("bundled corpus {file_name} missing"))
        })?;
    Ok(serde_json::from_str(contents)?)
}

/// How many passages make up one test of the given length
pub fn passage_count(kind: ContentKind, duration_secs: u64) -> usize {
    match (kind, duration_secs) {
        (ContentKind::Prose, d) if d >= 60 => 5,
        (ContentKind::Code, d) if d >= 60 => 3,
        (_, d) if d >= 30 => 2,
        _ => 1,
    }
}

pub fn random_sentence_count(duration_secs: u64) -> usize {
    match duration_secs {
        d if d >= 60 => 15,
        d if d >= 30 => 5,
        _ => 3,
    }
}

fn sample(items: &[String], count: usize) -> Vec<&str> {
    let mut rng = rand::thread_rng();
    items
        .choose_multiple(&mut rng, count.min(items.len()))
        .map(String::as_str)
        .collect()
}

fn random_prose(sentences: usize) -> String {
    let rng = &mut rand::thread_rng();
    (0..sentences)
        .map(|_| {
            cgisf(
                rng.gen_range(1..3),
                rng.gen_range(1..3),
                rng.gen_range(1..5),
                rng.gen_bool(0.5),
                rng.gen_range(1..3),
                rng.gen_bool(0.5),
            )
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

const FUNCTION_NAMES: &[&str] = &["process", "collect", "render", "parse", "merge", "score"];
const VARIABLE_NAMES: &[&str] = &["items", "values", "rows", "data", "entries", "nodes"];
const TYPE_NAMES: &[&str] = &["Buffer", "Ledger", "Session", "Tracker", "Queue"];

fn random_snippet(language: &str) -> String {
    let rng = &mut rand::thread_rng();
    let f = FUNCTION_NAMES.choose(rng).copied().unwrap_or("process");
    let a = VARIABLE_NAMES.choose(rng).copied().unwrap_or("items");
    let t = TYPE_NAMES.choose(rng).copied().unwrap_or("Buffer");
    let n = rng.gen_range(2..10);

    match (language, rng.gen_range(0..2)) {
        ("javascript", 0) => format!(
            "function {f}({a}) {{\n    return {a}.filter((x) => x > {n}).map((x) => x * 2);\n}}"
        ),
        ("javascript", _) => format!(
            "class {t} {{\n    constructor({a}) {{\n        this.{a} = {a};\n    }}\n\n    {f}() {{\n        return this.{a}.length;\n    }}\n}}"
        ),
        ("java", 0) => format!(
            "public int {f}(int[] {a}) {{\n    int total = 0;\n    for (int x : {a}) {{\n        if (x > {n}) {{\n            total += x;\n        }}\n    }}\n    return total;\n}}"
        ),
        ("java", _) => format!(
            "public class {t} {{\n    private final List<Integer> {a};\n\n    public int {f}() {{\n        return {a}.size();\n    }}\n}}"
        ),
        ("rust", 0) => format!(
            "fn {f}({a}: &[i64]) -> i64 {{\n    {a}.iter().filter(|x| **x > {n}).sum()\n}}"
        ),
        ("rust", _) => format!(
            "struct {t} {{\n    {a}: Vec<u32>,\n}}\n\nimpl {t} {{\n    fn {f}(&self) -> usize {{\n        self.{a}.len()\n    }}\n}}"
        ),
        (_, 0) => format!(
            "def {f}({a}):\n    return [x * 2 for x in {a} if x > {n}]"
        ),
        (_, _) => format!(
            "class {t}:\n    def __init__(self, {a}):\n        self.{a} = {a}\n\n    def {f}(self):\n        return len(self.{a})"
        ),
    }
}
