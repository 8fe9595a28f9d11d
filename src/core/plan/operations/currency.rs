#![allow(clippy::result_large_err)]

use crate::core::currency::{normalize_code, CurrencyError};
use crate::core::document::numbers::{number_value, round_to};
use crate::core::document::resolver::navigate;
use crate::core::document::{find, find_any, nkey, value_as_number, value_to_text, KeyMatch};
use crate::core::error::AppError;
use crate::core::plan::diagnostics::DiagnosticKind;
use crate::core::plan::operation::{invalid_params, Operation, StepContext, Verdict};
use crate::core::plan::Step;
use crate::core::semantic::FieldClassification;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

const TARGET_KEYS: [&str; 3] = ["target", "to", "currency"];

/// Field names tried when no classification is available.
const AMOUNT_KEYS: [&str; 9] = [
    "monto", "importe", "total", "subtotal", "precio", "precio_unitario", "amount", "price",
    "unit_price",
];
const CURRENCY_KEYS: [&str; 4] = ["moneda", "currency", "divisa", "currency_code"];

/// Converts monetary fields to a target currency, keeping originals in `<key>_orig`.
pub struct CurrencyToOperation;

impl Default for CurrencyToOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrencyToOperation {
    pub fn new() -> Self {
        Self
    }

    fn target(&self, step: &Step) -> Result<String, AppError> {
        let raw = step
            .first_str(&TARGET_KEYS)
            .ok_or_else(|| invalid_params(self.name(), "currency_to requires a target currency"))?;
        normalize_code(raw).map_err(|e| invalid_params(self.name(), e.to_string()))
    }

    async fn classify(doc: &Value, step: &Step, target: &str, ctx: &mut StepContext) -> FieldClassification {
        let columns = step.columns();
        let explicit_field = step.str_param("currency_field").map(str::to_string);

        let classified = if columns.is_empty() || explicit_field.is_none() {
            match ctx.env.semantic().classify_fields(doc, target).await {
                Ok(classification) => Some(classification),
                Err(err) => {
                    tracing::debug!(error = %err, "field classification unavailable");
                    None
                }
            }
        } else {
            None
        };
        let classified = classified.unwrap_or_default();

        let amount_fields = if !columns.is_empty() {
            columns
        } else if !classified.amount_fields.is_empty() {
            classified.amount_fields
        } else {
            AMOUNT_KEYS
                .iter()
                .filter(|key| !find(doc, key).is_empty())
                .map(|key| key.to_string())
                .collect()
        };
        let currency_field = explicit_field.or(classified.currency_field).or_else(|| {
            CURRENCY_KEYS
                .iter()
                .find(|key| !find(doc, key).is_empty())
                .map(|key| key.to_string())
        });

        FieldClassification {
            amount_fields,
            currency_field,
            source_currency: classified.source_currency,
        }
    }

    /// The currency field closest to `amount`: its own container first, then each
    /// enclosing object up to the root.
    fn governing_field(doc: &Value, amount: &KeyMatch, currency_field: &str) -> Option<KeyMatch> {
        let wanted = nkey(currency_field);
        (0..=amount.parent.len()).rev().find_map(|depth| {
            let parent = &amount.parent[..depth];
            navigate(doc, parent)?
                .as_object()?
                .keys()
                .find(|key| nkey(key) == wanted)
                .map(|key| KeyMatch::new(parent.to_vec(), key.clone()))
        })
    }

    /// Step `source`, then the governing currency field, then the classifier, then USD.
    fn source_currency(
        step: &Step,
        doc: &Value,
        currency_field: Option<&KeyMatch>,
        classified: Option<&str>,
    ) -> String {
        let from_doc = currency_field
            .and_then(|m| m.get(doc))
            .map(value_to_text)
            .and_then(|code| normalize_code(&code).ok());
        step.str_param("source")
            .and_then(|code| normalize_code(code).ok())
            .or(from_doc)
            .or_else(|| classified.and_then(|code| normalize_code(code).ok()))
            .unwrap_or_else(|| "usd".to_string())
    }
}

#[async_trait]
impl Operation for CurrencyToOperation {
    fn name(&self) -> &'static str {
        "currency_to"
    }

    fn validate_params(&self, step: &Step) -> Result<(), AppError> {
        self.target(step)?;
        if let Some(rate) = step.param("rate") {
            if value_as_number(rate).map_or(true, |r| r <= 0.0) {
                return Err(invalid_params(self.name(), "rate must be a positive number"));
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        doc: &mut Value,
        step: &Step,
        ctx: &mut StepContext,
    ) -> Result<Verdict, AppError> {
        let target = self.target(step)?;
        let date = step.str_param("date").unwrap_or("latest").to_string();
        let classification = Self::classify(doc, step, &target, ctx).await;

        let amounts = find_any(doc, &classification.amount_fields);
        if amounts.is_empty() {
            tracing::debug!(target = %target, "no monetary fields found");
            return Ok(Verdict::Keep);
        }

        let env = ctx.env.clone();
        let fixed_rate = step.param("rate").and_then(value_as_number);
        let mut rates: HashMap<String, Result<f64, CurrencyError>> = HashMap::new();
        // Failed conversions per governing currency field; `None` collects amounts with no field.
        let mut governed: HashMap<Option<KeyMatch>, usize> = HashMap::new();
        let mut failures = 0;

        for m in amounts {
            let Some(original) = m.get(doc).cloned() else {
                continue;
            };
            let field = classification
                .currency_field
                .as_deref()
                .and_then(|name| Self::governing_field(doc, &m, name));
            let source = Self::source_currency(
                step,
                doc,
                field.as_ref(),
                classification.source_currency.as_deref(),
            );
            let failed = governed.entry(field).or_insert(0);

            let Some(amount) = value_as_number(&original) else {
                *failed += 1;
                failures += 1;
                ctx.diagnose(
                    DiagnosticKind::ParseFailure,
                    Some(m.path()),
                    format!("'{}' is not an amount", value_to_text(&original)),
                );
                continue;
            };
            let rate = match fixed_rate {
                Some(fixed) => Ok(fixed),
                None => match rates.get(&source).cloned() {
                    Some(known) => known,
                    None => {
                        let fetched = env.currency().rate(&source, &target, &date).await;
                        rates.insert(source.clone(), fetched.clone());
                        fetched
                    }
                },
            };
            let rate = match rate {
                Ok(rate) => rate,
                Err(err) => {
                    *failed += 1;
                    failures += 1;
                    ctx.diagnose(DiagnosticKind::CurrencyUnavailable, Some(m.path()), err.to_string());
                    continue;
                }
            };

            let converted = round_to(amount * rate, 2);
            let replacement = match original {
                Value::Number(_) => number_value(converted).unwrap_or(Value::Null),
                _ => Value::String(format!("{:.2}", converted)),
            };
            m.insert_sibling(doc, &format!("{}_orig", m.key), original);
            m.set(doc, replacement);
            tracing::info!(path = %m, from = %source, to = %target, rate, "converted amount");
        }

        let relabel_anyway = env.config().currency.relabel_on_failure;
        let label = Value::String(target.to_uppercase());
        for field in classification
            .currency_field
            .as_deref()
            .map(|name| find(doc, name))
            .unwrap_or_default()
        {
            // A field no amount resolved to follows the document as a whole.
            let failed = governed.get(&Some(field.clone())).copied().unwrap_or(failures);
            if failed == 0 || relabel_anyway {
                field.set(doc, label.clone());
            }
        }
        Ok(Verdict::Keep)
    }
}
