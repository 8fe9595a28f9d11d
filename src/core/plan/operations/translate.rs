#![allow(clippy::result_large_err)]

use crate::core::document::normalize::textual_fields;
use crate::core::document::resolver::{items_nodes, navigate};
use crate::core::document::{find_any, KeyMatch};
use crate::core::error::AppError;
use crate::core::plan::diagnostics::DiagnosticKind;
use crate::core::plan::operation::{invalid_params, Operation, StepContext, Verdict};
use crate::core::plan::Step;
use crate::core::semantic::normalize_lang;
use async_trait::async_trait;
use serde_json::Value;

const LANG_KEYS: [&str; 5] = ["target_lang", "lang", "language", "target", "to"];

/// Translates string fields through the semantic service. Failures leave the field as is.
pub struct TranslateValuesOperation;

impl Default for TranslateValuesOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslateValuesOperation {
    pub fn new() -> Self {
        Self
    }

    fn string_matches(doc: &Value, matches: Vec<KeyMatch>) -> Vec<KeyMatch> {
        matches
            .into_iter()
            .filter(|m| m.get(doc).is_some_and(Value::is_string))
            .collect()
    }

    /// Prose-like fields of line items, used when no named column matched.
    fn item_fields(doc: &Value) -> Vec<KeyMatch> {
        items_nodes(doc)
            .into_iter()
            .filter_map(|path| {
                let object = navigate(doc, &path)?.as_object()?;
                Some(
                    textual_fields(object)
                        .into_iter()
                        .map(|key| KeyMatch::new(path.clone(), key))
                        .collect::<Vec<_>>(),
                )
            })
            .flatten()
            .collect()
    }
}

#[async_trait]
impl Operation for TranslateValuesOperation {
    fn name(&self) -> &'static str {
        "translate_values"
    }

    fn validate_params(&self, step: &Step) -> Result<(), AppError> {
        if step.first_str(&LANG_KEYS).is_none() {
            return Err(invalid_params(self.name(), "translate_values requires target_lang"));
        }
        Ok(())
    }

    async fn apply(
        &self,
        doc: &mut Value,
        step: &Step,
        ctx: &mut StepContext,
    ) -> Result<Verdict, AppError> {
        let Some(lang) = step.first_str(&LANG_KEYS).map(normalize_lang) else {
            return Ok(Verdict::Keep);
        };
        let columns = step.columns();
        let mut targets = Self::string_matches(doc, find_any(doc, &columns));
        if targets.is_empty() {
            targets = Self::item_fields(doc);
        }

        let env = ctx.env.clone();
        for m in targets {
            let Some(text) = m.get(doc).and_then(Value::as_str).map(str::to_string) else {
                continue;
            };
            match env.semantic().translate_text(&text, &lang).await {
                Ok(translated) if !translated.trim().is_empty() => {
                    m.set(doc, Value::String(translated.trim().to_string()));
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(path = %m, error = %err, "translation unavailable");
                    ctx.diagnose(
                        DiagnosticKind::SemanticFallback,
                        Some(m.path()),
                        format!("translation to {} unavailable: {}", lang, err),
                    );
                }
            }
        }
        Ok(Verdict::Keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plan::operations::testing::{env_with, Scripted};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn scripted() -> Arc<Scripted> {
        Arc::new(Scripted {
            translations: HashMap::from([
                ("tornillo de acero".to_string(), "steel screw".to_string()),
                ("tuerca hexagonal grande".to_string(), "large hex nut".to_string()),
            ]),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn translates_named_columns() {
        let mut ctx = StepContext::new(env_with(Some(scripted())), 0);
        let step = Step::new("translate_values")
            .with("columns", json!(["descripcion"]))
            .with("target_lang", "inglés");
        let mut doc = json!({"descripcion": "tornillo de acero", "codigo": "A-1"});
        TranslateValuesOperation::new()
            .apply(&mut doc, &step, &mut ctx)
            .await
            .unwrap();
        assert_eq!(doc, json!({"descripcion": "steel screw", "codigo": "A-1"}));
        assert!(ctx.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_item_prose() {
        let mut ctx = StepContext::new(env_with(Some(scripted())), 0);
        let step = Step::new("translate_values")
            .with("column", "detalle")
            .with("target_lang", "en");
        let mut doc = json!({"items": [{"desc": "tuerca hexagonal grande", "sku": "TX-99/1"}]});
        TranslateValuesOperation::new()
            .apply(&mut doc, &step, &mut ctx)
            .await
            .unwrap();
        assert_eq!(doc, json!({"items": [{"desc": "large hex nut", "sku": "TX-99/1"}]}));
    }

    #[tokio::test]
    async fn failure_leaves_field_unchanged() {
        let mut ctx = StepContext::new(env_with(None), 0);
        let step = Step::new("translate_values")
            .with("column", "descripcion")
            .with("target_lang", "de");
        let mut doc = json!({"descripcion": "arandela plana"});
        TranslateValuesOperation::new()
            .apply(&mut doc, &step, &mut ctx)
            .await
            .unwrap();
        assert_eq!(doc, json!({"descripcion": "arandela plana"}));
        assert_eq!(ctx.diagnostics[0].kind, DiagnosticKind::SemanticFallback);
    }
}
