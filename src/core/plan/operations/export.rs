#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::plan::operation::{invalid_params, Operation, StepContext, Verdict};
use crate::core::plan::Step;
use crate::utils::ExportFormat;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

pub const DEFAULT_EXPORT_STEM: &str = "output/resultado";

const PATH_KEYS: [&str; 3] = ["path", "file", "output"];

/// Where and how an export step writes the surviving batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub path: PathBuf,
    pub format: ExportFormat,
}

impl ExportTarget {
    /// `format` wins over the extension. Spreadsheet extensions are rewritten to `.csv`.
    pub fn from_step(step: &Step) -> ExportTarget {
        let named = step.str_param("format").and_then(ExportFormat::from_name);
        match step.first_str(&PATH_KEYS) {
            Some(raw) => {
                let mut path = PathBuf::from(raw);
                let format = named.unwrap_or_else(|| ExportFormat::from_path(&path));
                let extension = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase);
                if matches!(extension.as_deref(), None | Some("xlsx") | Some("xls")) {
                    path.set_extension(format.extension());
                }
                ExportTarget { path, format }
            }
            None => {
                let format = named.unwrap_or(ExportFormat::Json);
                ExportTarget {
                    path: PathBuf::from(format!("{}.{}", DEFAULT_EXPORT_STEM, format.extension())),
                    format,
                }
            }
        }
    }
}

/// Marks the batch for export. The executor writes the file once the batch finishes.
pub struct ExportOperation;

impl Default for ExportOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportOperation {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Operation for ExportOperation {
    fn name(&self) -> &'static str {
        "export"
    }

    fn validate_params(&self, step: &Step) -> Result<(), AppError> {
        if let Some(format) = step.str_param("format") {
            if ExportFormat::from_name(format).is_none() {
                return Err(invalid_params(
                    self.name(),
                    format!("unsupported export format '{}'", format),
                ));
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        _doc: &mut Value,
        _step: &Step,
        _ctx: &mut StepContext,
    ) -> Result<Verdict, AppError> {
        Ok(Verdict::Keep)
    }
}
