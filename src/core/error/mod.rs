//! Errors that abort a docplan command.
//!
//! Problems with a single field or document never end up here: operations record them
//! as [`Diagnostic`](crate::core::plan::Diagnostic)s and the batch carries on. An
//! `AppError` means the command itself cannot proceed, so every one carries a stable
//! [`ErrorCode`] that scripts can match on.

use crate::core::types::ErrorCategory;
use std::collections::BTreeMap;
use std::fmt;

/// Stable identifiers for every failure docplan reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// docplan.toml exists but cannot be read.
    ConfigUnreadable,
    /// docplan.toml is not valid TOML for the engine config.
    ConfigMalformed,
    /// A configuration value failed validation.
    ConfigInvalid,
    SemanticClient,
    RateClient,
    /// Neither compiler produced a step for the instruction.
    NoPlan,
    /// A plan step is missing a parameter or carries an unusable one.
    InvalidStep,
    ExportDirectory,
    ExportWrite,
    ExportRename,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ConfigUnreadable => "CFG-LOAD-001",
            ErrorCode::ConfigMalformed => "CFG-PARSE-001",
            ErrorCode::ConfigInvalid => "CFG-VALIDATE-001",
            ErrorCode::SemanticClient => "ENV-BUILD-001",
            ErrorCode::RateClient => "ENV-BUILD-002",
            ErrorCode::NoPlan => "PLAN-COMPILE-001",
            ErrorCode::InvalidStep => "PLAN-PARAMS-001",
            ErrorCode::ExportDirectory => "IO-WRITE-001",
            ErrorCode::ExportWrite => "IO-WRITE-002",
            ErrorCode::ExportRename => "IO-WRITE-003",
        }
    }

    pub const fn category(self) -> ErrorCategory {
        match self {
            ErrorCode::ConfigUnreadable | ErrorCode::ConfigMalformed => ErrorCategory::ConfigError,
            ErrorCode::ConfigInvalid | ErrorCode::InvalidStep => ErrorCategory::ValidationError,
            ErrorCode::SemanticClient | ErrorCode::RateClient => ErrorCategory::EnvironmentError,
            ErrorCode::NoPlan => ErrorCategory::PlanError,
            ErrorCode::ExportDirectory | ErrorCode::ExportWrite | ErrorCode::ExportRename => {
                ErrorCategory::IoError
            }
        }
    }

    fn hint(self) -> Option<&'static str> {
        match self {
            ErrorCode::ConfigMalformed | ErrorCode::ConfigInvalid => {
                Some("check docplan.toml and the DOCPLAN_* variables")
            }
            ErrorCode::SemanticClient => Some("set semantic.enabled = false to compile with rules only"),
            ErrorCode::ExportDirectory | ErrorCode::ExportWrite | ErrorCode::ExportRename => {
                Some("check executor.export_dir and its permissions")
            }
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct AppError {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
    /// Named values (instruction, op, path) that locate the failure.
    pub context: BTreeMap<String, String>,
    pub recovery_suggestions: Vec<String>,
    pub source: Option<anyhow::Error>,
}

impl AppError {
    pub fn new<T: Into<String>>(code: ErrorCode, message: T) -> Self {
        AppError {
            code,
            category: code.category(),
            message: message.into(),
            context: BTreeMap::new(),
            recovery_suggestions: code.hint().map(str::to_string).into_iter().collect(),
            source: None,
        }
    }

    pub fn caused_by<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(anyhow::Error::new(source));
        self
    }

    pub fn with_context(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    pub fn with_suggestion<T: Into<String>>(mut self, suggestion: T) -> Self {
        self.recovery_suggestions.push(suggestion.into());
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.category, self.message)?;
        if !self.context.is_empty() {
            let pairs: Vec<String> = self
                .context
                .iter()
                .map(|(key, value)| format!("{}={:?}", key, value))
                .collect();
            write!(f, " ({})", pairs.join(", "))?;
        }
        if let Some(ref source) = self.source {
            write!(f, "\nCaused by: {}", source)?;
        }
        for suggestion in &self.recovery_suggestions {
            write!(f, "\nhint: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
