use super::{
    clip, extract_json, language_name, normalize_lang, FieldClassification, SemanticError,
    SemanticService, UnitGuess,
};
use crate::core::config::SemanticConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const PLAN_SYSTEM: &str = "\
You turn a user's data-transformation instruction (usually Spanish) into a JSON plan.
Return ONLY a JSON object: {\"plan\": [...], \"report\": {\"decisions\": []}}.
Allowed steps (use only what is needed, keep the keys exactly):
- {\"op\":\"rename_columns\",\"map\":{\"<from>\":\"<to>\"}}
- {\"op\":\"format_date\",\"column\":\"<col>\",\"input_fmt\":\"infer\",\"output_fmt\":\"%Y-%m-%d\"}
- {\"op\":\"translate_values\",\"columns\":[\"<col>\"],\"target_lang\":\"EN\"}
- {\"op\":\"convert_units\",\"columns\":[\"<col>\"],\"target_unit\":\"mm|cm|m|in|kg|g|lb|l|ml\"}
- {\"op\":\"filter_equals\",\"column\":\"<col>\",\"value\":\"<text>\"}
- {\"op\":\"filter_contains\",\"column\":\"<col>\",\"value\":\"<substring>\"}
- {\"op\":\"filter_compare\",\"column\":\"<col>\",\"cmp\":\"<|<=|>|>=\",\"value\":\"<number>\"}
- {\"op\":\"filter_between\",\"column\":\"<col>\",\"range\":[\"<from>\",\"<to>\"]}
- {\"op\":\"currency_to\",\"columns\":[\"<col>\"],\"target\":\"USD|EUR|ARS\"}
- {\"op\":\"export\",\"format\":\"csv|json\",\"path\":\"output/resultado.<ext>\"}
Never invent columns. Quoted names in the instruction are column names.";

const CONVERT_SYSTEM: &str = "\
You are a units expert working on JSON documents.
Detect convertible fields (value+unit pairs and strings like '12 cm'), read their current
unit, convert them to the TARGET units, update unit fields when present, and leave
incompatible fields untouched. Keep every key and the exact structure.
Return ONLY JSON: {\"doc\": <transformed document>, \"report\": {\"converted\": [], \"errors\": []}}";

const TRANSLATE_SYSTEM: &str = "\
You are a professional technical translator and editor.
Always produce natural, well-formed text in the target language. Rewrite mixed-language
input in the target language. Translate common nouns even in UPPERCASE; keep brand names,
model codes and part numbers exactly. No explanations or notes: return only the translation.";

const CLASSIFY_SYSTEM: &str = "\
Return ONLY JSON shaped {\"columns\": [\"...\"], \"currency_field\": \"...\", \"source\": \"...\"}.
columns: exact keys whose values are money amounts.
currency_field: exact key holding the currency label, or null.
source: ISO 4217 code of the amounts' currency, or null.
Never invent keys or currencies.";

const DEFINE_UNIT_SYSTEM: &str = "\
You map a human unit name in any language to a standard unit.
Return ONLY JSON {\"factor\": <number>, \"unit\": \"<symbol>\"} meaning 1 <name> = factor unit,
for example {\"factor\": 2.54, \"unit\": \"cm\"} for 'Zoll'. Return {} if unsure.";

const CLEANUP_SYSTEM: &str = "\
Fix spacing, casing and obvious OCR errors in the text. Keep its language, numbers, codes
and meaning. Return only the corrected text.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: String,
}

/// Semantic service backed by an Ollama `/api/chat` endpoint.
pub struct OllamaSemanticService {
    client: reqwest::Client,
    config: SemanticConfig,
}

impl OllamaSemanticService {
    pub fn new(config: SemanticConfig) -> Result<Self, SemanticError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SemanticError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.config.host.trim_end_matches('/'))
    }

    async fn chat(&self, system: &str, user: &str, json_mode: bool) -> Result<String, SemanticError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
            format: json_mode.then_some("json"),
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| SemanticError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SemanticError::Status(response.status().as_u16()));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| SemanticError::MalformedReply(e.to_string()))?;
        let content = parsed.message.map(|m| m.content).unwrap_or_default();
        tracing::debug!(model = %self.config.model, chars = content.len(), "semantic reply received");
        Ok(content)
    }

    async fn chat_json(&self, system: &str, user: &str) -> Result<Value, SemanticError> {
        let raw = self.chat(system, user, true).await?;
        extract_json(&raw).ok_or_else(|| {
            SemanticError::MalformedReply(clip(raw.trim(), 200).to_string())
        })
    }

    fn document_text(&self, doc: &Value) -> String {
        let text = doc.to_string();
        clip(&text, self.config.input_limit).to_string()
    }
}

fn optional_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl SemanticService for OllamaSemanticService {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn compile_instruction(
        &self,
        instruction: &str,
        context: Option<&Value>,
    ) -> Result<Value, SemanticError> {
        let mut user = format!(
            "USER INSTRUCTION:\n\"\"\"{}\"\"\"",
            clip(instruction.trim(), self.config.input_limit)
        );
        if let Some(doc) = context {
            user.push_str("\n\nDOCUMENT SAMPLE:\n");
            user.push_str(&self.document_text(doc));
        }
        let reply = self.chat_json(PLAN_SYSTEM, &user).await?;
        if !reply.is_object() {
            return Err(SemanticError::MalformedReply("plan reply is not an object".into()));
        }
        Ok(reply)
    }

    async fn convert_document(&self, doc: &Value, target: &Value) -> Result<Value, SemanticError> {
        let user = format!(
            "TARGET:\n{}\n\nDOC:\n{}\n\nKeep the format and return the final JSON now.",
            target,
            self.document_text(doc)
        );
        let mut reply = self.chat_json(CONVERT_SYSTEM, &user).await?;
        match reply.get_mut("doc").map(Value::take) {
            Some(converted) => Ok(converted),
            None => Ok(reply),
        }
    }

    async fn translate_text(&self, text: &str, target_lang: &str) -> Result<String, SemanticError> {
        let code = normalize_lang(target_lang);
        let user = format!(
            "Target language: {}\n\nText to translate:\n{}\nReturn only the translation.",
            language_name(&code),
            clip(text, self.config.input_limit)
        );
        let reply = self.chat(TRANSLATE_SYSTEM, &user, false).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(SemanticError::MalformedReply("empty translation".into()));
        }
        Ok(reply.to_string())
    }

    async fn classify_fields(
        &self,
        doc: &Value,
        target_currency: &str,
    ) -> Result<FieldClassification, SemanticError> {
        let user = format!(
            "Target currency: {}\nJSON document (truncated):\n```\n{}\n```\nReturn columns, currency_field and source.",
            target_currency.to_uppercase(),
            self.document_text(doc)
        );
        let reply = self.chat_json(CLASSIFY_SYSTEM, &user).await?;
        let amount_fields = reply
            .get("columns")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| optional_string(Some(item)))
                    .collect()
            })
            .unwrap_or_default();
        Ok(FieldClassification {
            amount_fields,
            currency_field: optional_string(reply.get("currency_field").or(reply.get("tag"))),
            source_currency: optional_string(reply.get("source")).map(|s| s.to_uppercase()),
        })
    }

    async fn define_unit(&self, name: &str) -> Result<Option<UnitGuess>, SemanticError> {
        let user = format!("Human unit name: {}\nReturn ONLY JSON.", name);
        let reply = self.chat_json(DEFINE_UNIT_SYSTEM, &user).await?;
        let factor = reply.get("factor").and_then(Value::as_f64);
        let unit = optional_string(reply.get("unit"));
        Ok(match (factor, unit) {
            (Some(factor), Some(base_unit)) if factor.is_finite() && factor > 0.0 => {
                Some(UnitGuess { factor, base_unit })
            }
            _ => None,
        })
    }

    async fn cleanup_text(&self, text: &str) -> Result<String, SemanticError> {
        let reply = self
            .chat(CLEANUP_SYSTEM, clip(text, self.config.input_limit), false)
            .await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(SemanticError::MalformedReply("empty cleanup".into()));
        }
        Ok(reply.to_string())
    }
}
