//! Optional language-model collaborator.
//!
//! Every method may fail; callers treat an `Err` as "no usable result" and fall back
//! to the deterministic path.

pub mod ollama;

pub use ollama::OllamaSemanticService;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SemanticError {
    #[error("semantic service is disabled")]
    Disabled,

    #[error("{0} is not supported by this semantic service")]
    Unsupported(&'static str),

    #[error("semantic request failed: {0}")]
    Network(String),

    #[error("semantic service answered HTTP {0}")]
    Status(u16),

    #[error("malformed semantic reply: {0}")]
    MalformedReply(String),
}

/// Which fields of a document hold money and in which currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldClassification {
    #[serde(default)]
    pub amount_fields: Vec<String>,
    #[serde(default)]
    pub currency_field: Option<String>,
    #[serde(default)]
    pub source_currency: Option<String>,
}

/// `1 <name> = factor <base_unit>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitGuess {
    pub factor: f64,
    pub base_unit: String,
}

#[async_trait]
pub trait SemanticService: Send + Sync {
    fn name(&self) -> &'static str;

    /// Reply object expected to carry a `plan` array.
    async fn compile_instruction(
        &self,
        instruction: &str,
        context: Option<&Value>,
    ) -> Result<Value, SemanticError>;

    /// Convert measurements in `doc` to `target` (a unit name or `{"to": {...}}`).
    async fn convert_document(&self, doc: &Value, target: &Value) -> Result<Value, SemanticError>;

    async fn translate_text(&self, text: &str, target_lang: &str) -> Result<String, SemanticError>;

    async fn classify_fields(
        &self,
        doc: &Value,
        target_currency: &str,
    ) -> Result<FieldClassification, SemanticError>;

    async fn define_unit(&self, _name: &str) -> Result<Option<UnitGuess>, SemanticError> {
        Err(SemanticError::Unsupported("define_unit"))
    }

    async fn cleanup_text(&self, _text: &str) -> Result<String, SemanticError> {
        Err(SemanticError::Unsupported("cleanup_text"))
    }
}

/// Stand-in used when no model is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSemanticService;

#[async_trait]
impl SemanticService for DisabledSemanticService {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn compile_instruction(
        &self,
        _instruction: &str,
        _context: Option<&Value>,
    ) -> Result<Value, SemanticError> {
        Err(SemanticError::Disabled)
    }

    async fn convert_document(&self, _doc: &Value, _target: &Value) -> Result<Value, SemanticError> {
        Err(SemanticError::Disabled)
    }

    async fn translate_text(&self, _text: &str, _lang: &str) -> Result<String, SemanticError> {
        Err(SemanticError::Disabled)
    }

    async fn classify_fields(
        &self,
        _doc: &Value,
        _target_currency: &str,
    ) -> Result<FieldClassification, SemanticError> {
        Err(SemanticError::Disabled)
    }

    async fn define_unit(&self, _name: &str) -> Result<Option<UnitGuess>, SemanticError> {
        Err(SemanticError::Disabled)
    }

    async fn cleanup_text(&self, _text: &str) -> Result<String, SemanticError> {
        Err(SemanticError::Disabled)
    }
}

static FENCED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```(?:json)?\s*(.*?)```").expect("valid regex"));

/// Pull a JSON value out of a model reply: plain JSON, a fenced block, or the
/// first balanced `{...}` object.
pub fn extract_json(raw: &str) -> Option<Value> {
    let mut text = raw.trim();
    if let Some(caps) = FENCED.captures(text) {
        if let Some(inner) = caps.get(1) {
            text = inner.as_str().trim();
        }
    }
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return serde_json::from_str(&text[start..end]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

/// ISO 639-1 code for a language name or code in English or Spanish.
pub fn normalize_lang(raw: &str) -> String {
    let folded = crate::core::document::nkey(raw);
    let code = match folded.as_str() {
        "en" | "eng" | "english" | "ingles" => "EN",
        "es" | "spa" | "spanish" | "espanol" | "castellano" => "ES",
        "de" | "deu" | "german" | "aleman" => "DE",
        "fr" | "fra" | "french" | "frances" => "FR",
        "it" | "ita" | "italian" | "italiano" => "IT",
        "pt" | "por" | "portuguese" | "portugues" => "PT",
        "zh" | "chinese" | "chino" => "ZH",
        _ => return raw.trim().to_uppercase(),
    };
    code.to_string()
}

/// English display name for a language code, used in prompts.
pub fn language_name(code: &str) -> &str {
    match code {
        "EN" => "English",
        "ES" => "Spanish",
        "DE" => "German",
        "FR" => "French",
        "IT" => "Italian",
        "PT" => "Portuguese",
        "ZH" => "Chinese",
        other => other,
    }
}

/// Truncate to at most `limit` characters on a char boundary.
pub fn clip(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
