//! Whole-document text passes run before and after a plan.

use super::numbers::{format_decimal, is_pure_numeric_like, parse_number};
use super::resolver::{navigate_mut, string_paths, PathSegment};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w.\-]+@[\w.\-]+").expect("valid regex"));
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://|www\.").expect("valid regex"));

const MIN_GLUED_LEN: usize = 12;

fn is_upper_letter(c: char) -> bool {
    c.is_ascii_uppercase() || "ÁÉÍÓÚÜÑ".contains(c)
}

fn is_vowel(c: char) -> bool {
    "AEIOUÁÉÍÓÚÜ".contains(c)
}

fn is_all_caps(token: &str) -> bool {
    !token.is_empty() && token.chars().all(is_upper_letter)
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Split an OCR-glued capitals token such as `TORNILLOHEXAGONAL` at vowel to
/// consonant boundaries. Fragments shorter than three letters are merged back.
fn split_caps_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let n = chars.len();
    if n < MIN_GLUED_LEN || !is_all_caps(token) {
        return token.to_string();
    }
    let mut parts: Vec<String> = Vec::new();
    let mut start = 0;
    for i in 1..n {
        if i - start >= 3 && is_vowel(chars[i - 1]) && !is_vowel(chars[i]) {
            let rest = &chars[i..];
            if rest.len() >= 3 && rest.iter().any(|c| is_vowel(*c)) {
                parts.push(chars[start..i].iter().collect());
                start = i;
            }
        }
    }
    parts.push(chars[start..].iter().collect());

    let mut merged: Vec<String> = Vec::new();
    for part in parts {
        match merged.last_mut() {
            Some(last) if part.chars().count() < 3 => last.push_str(&part),
            _ => merged.push(part),
        }
    }
    merged.join(" ")
}

pub fn split_glued_caps(text: &str) -> String {
    text.split(' ')
        .map(split_caps_token)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deterministic cleanup applied to every string in the pre-pass.
pub fn fix_text(text: &str) -> String {
    split_glued_caps(&collapse_whitespace(text))
}

fn alpha_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    letters as f64 / total as f64
}

/// Prose-like text: mostly letters, more than one word, not an email or URL.
pub fn looks_like_textual(text: &str) -> bool {
    if text.is_empty() || EMAIL.is_match(text) || URL.is_match(text) {
        return false;
    }
    alpha_ratio(text) >= 0.6 && text.contains(' ')
}

/// Part numbers, codes and symbol-heavy strings.
pub fn looks_like_codeish(text: &str) -> bool {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return false;
    }
    let upper_short = tokens
        .iter()
        .filter(|t| t.chars().count() <= 3 && t.chars().any(|c| c.is_alphabetic()))
        .filter(|t| !t.chars().any(|c| c.is_lowercase()))
        .count();
    let threshold = ((tokens.len() as f64) * 0.8) as usize;
    if upper_short >= threshold.max(1) {
        return true;
    }
    let total = text.chars().count().max(1);
    let noisy = text
        .chars()
        .filter(|c| c.is_ascii_digit() || "/\\-_.:#()[],".contains(*c))
        .count();
    noisy as f64 / total as f64 >= 0.5
}

/// Candidates for semantic cleanup after the deterministic fix.
pub fn wants_semantic_cleanup(text: &str) -> bool {
    looks_like_textual(text) && !looks_like_codeish(text)
}

/// Keys of `object` whose values are prose-like strings.
pub fn textual_fields(object: &Map<String, Value>) -> Vec<String> {
    object
        .iter()
        .filter_map(|(key, value)| {
            let text = value.as_str()?;
            wants_semantic_cleanup(text).then(|| key.clone())
        })
        .collect()
}

/// Apply [`fix_text`] to every string in the document. Returns how many changed.
pub fn pre_pass(doc: &mut Value) -> usize {
    let mut changed = 0;
    for path in string_paths(doc) {
        if let Some(Value::String(s)) = navigate_mut(doc, &path) {
            let fixed = fix_text(s);
            if fixed != *s {
                *s = fixed;
                changed += 1;
            }
        }
    }
    changed
}

/// Strings in the document that qualify for semantic cleanup, with their paths.
pub fn cleanup_candidates(doc: &Value, max_chars: usize) -> Vec<(Vec<PathSegment>, String)> {
    let mut out = Vec::new();
    for path in string_paths(doc) {
        if let Some(Value::String(s)) = super::resolver::navigate(doc, &path) {
            if s.chars().count() <= max_chars && wants_semantic_cleanup(s) {
                out.push((path, s.clone()));
            }
        }
    }
    out
}

/// Rewrite numeric strings that carry a separator into fixed-decimal form.
///
/// Bare integers are left alone since they are usually identifiers.
pub fn post_pass(doc: &mut Value, places: usize, separator: &str) -> usize {
    let mut changed = 0;
    for path in string_paths(doc) {
        if let Some(Value::String(s)) = navigate_mut(doc, &path) {
            if !is_pure_numeric_like(s) || !s.contains(['.', ',']) {
                continue;
            }
            if let Some(n) = parse_number(s) {
                let formatted = format_decimal(n, places, separator);
                if formatted != *s {
                    *s = formatted;
                    changed += 1;
                }
            }
        }
    }
    changed
}
