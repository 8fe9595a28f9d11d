#![allow(clippy::result_large_err)]

use crate::core::document::find;
use crate::core::document::RenameError;
use crate::core::error::AppError;
use crate::core::plan::diagnostics::DiagnosticKind;
use crate::core::plan::operation::{invalid_params, Operation, StepContext, Verdict};
use crate::core::plan::Step;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Renames every occurrence of each mapped field, keeping its position.
pub struct RenameColumnsOperation;

impl Default for RenameColumnsOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl RenameColumnsOperation {
    pub fn new() -> Self {
        Self
    }

    fn mapping(step: &Step) -> Option<&Map<String, Value>> {
        ["map", "mapping", "columns"]
            .iter()
            .find_map(|key| step.param(key).and_then(Value::as_object))
    }
}

#[async_trait]
impl Operation for RenameColumnsOperation {
    fn name(&self) -> &'static str {
        "rename_columns"
    }

    fn validate_params(&self, step: &Step) -> Result<(), AppError> {
        let mapping = Self::mapping(step)
            .ok_or_else(|| invalid_params(self.name(), "rename_columns requires a map object"))?;
        if mapping.is_empty() {
            return Err(invalid_params(self.name(), "rename map is empty"));
        }
        if let Some((old, _)) = mapping
            .iter()
            .find(|(_, new)| new.as_str().map_or(true, |s| s.trim().is_empty()))
        {
            return Err(invalid_params(
                self.name(),
                format!("new name for '{}' must be a non-empty string", old),
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
        let Some(mapping) = Self::mapping(step) else {
            return Ok(Verdict::Keep);
        };
        for (old, new) in mapping {
            let Some(new) = new.as_str().map(str::trim) else {
                continue;
            };
            let mut matches = find(doc, old);
            // Deepest first so an outer rename never invalidates a nested path.
            matches.sort_by(|a, b| b.parent.len().cmp(&a.parent.len()));
            for m in matches {
                match m.rename(doc, new) {
                    Ok(renamed) => tracing::debug!(from = %m, to = %renamed, "renamed field"),
                    Err(err @ RenameError::Occupied { .. }) => {
                        ctx.diagnose(DiagnosticKind::KeyCollision, Some(m.path()), err.to_string());
                    }
                    Err(RenameError::Missing(_)) => {}
                }
            }
        }
        Ok(Verdict::Keep)
    }
}
