use crate::text::ReferenceText;

/// Classification of a single reference position against the typed buffer
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum CharVerdict {
    Untouched,
    Correct,
    Incorrect,
    Current,
}

/// Classifies every reference position against `typed`.
///
/// Pure and recomputed from scratch each call. Newlines, tabs and spaces
/// compare like any other char; how they are drawn is the renderer's business.
pub fn diff(reference: &ReferenceText, typed: &[char]) -> Vec<CharVerdict> {
    reference
        .chars()
        .iter()
        .enumerate()
        .map(|(idx, expected)| match typed.get(idx) {
            Some(actual) if actual == expected => CharVerdict::Correct,
            Some(_) => CharVerdict::Incorrect,
            None if idx == typed.len() => CharVerdict::Current,
            None => CharVerdict::Untouched,
        })
        .collect()
}

/// Mismatched positions across the whole typed prefix
pub fn count_errors(reference: &ReferenceText, typed: &[char]) -> usize {
    typed
        .iter()
        .zip(reference.chars())
        .filter(|(actual, expected)| actual != expected)
        .count()
}
