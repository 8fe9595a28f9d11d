#![allow(clippy::result_large_err)]

use crate::core::dates::{self, CANONICAL_FORMAT};
use crate::core::document::{find_any, value_to_text};
use crate::core::error::AppError;
use crate::core::plan::diagnostics::DiagnosticKind;
use crate::core::plan::operation::{invalid_params, Operation, StepContext, Verdict};
use crate::core::plan::Step;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

const INPUT_KEYS: [&str; 3] = ["input_fmt", "input_format", "from"];
const OUTPUT_KEYS: [&str; 4] = ["output_fmt", "output_format", "format", "to"];

/// Reformats date fields. Without a column, every date-looking string is normalized.
pub struct FormatDateOperation;

impl Default for FormatDateOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatDateOperation {
    pub fn new() -> Self {
        Self
    }

    fn output_format(step: &Step) -> &str {
        step.first_str(&OUTPUT_KEYS).unwrap_or(CANONICAL_FORMAT)
    }
}

#[async_trait]
impl Operation for FormatDateOperation {
    fn name(&self) -> &'static str {
        "format_date"
    }

    fn validate_params(&self, step: &Step) -> Result<(), AppError> {
        let layout = Self::output_format(step);
        let sample = NaiveDate::from_ymd_opt(2024, 1, 5)
            .ok_or_else(|| invalid_params(self.name(), "sample date out of range"))?;
        if dates::render(sample, layout).is_none() {
            return Err(invalid_params(
                self.name(),
                format!("output format '{}' is not a valid date layout", layout),
            ));
        }
        Ok(())
    }

    async fn apply(
        &self,
        doc: &mut Value,
        step: &Step,
        ctx: &mut StepContext,
    ) -> Result<Verdict, AppError> {
        let output = Self::output_format(step);
        let input = step.first_str(&INPUT_KEYS);
        let columns = step.columns();

        if columns.is_empty() {
            let changed = dates::normalize_dates_everywhere(doc, output);
            tracing::debug!(changed, "normalized dates across document");
            return Ok(Verdict::Keep);
        }

        for m in find_any(doc, &columns) {
            let Some(value) = m.get(doc) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let raw = value_to_text(value);
            match dates::format_date(&raw, input, output) {
                Some(formatted) => {
                    m.set(doc, Value::String(formatted));
                }
                None => ctx.diagnose(
                    DiagnosticKind::ParseFailure,
                    Some(m.path()),
                    format!("could not parse '{}' as a date", raw),
                ),
            }
        }
        Ok(Verdict::Keep)
    }
}
