use crate::core::units::UnitError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ParseFailure,
    DimensionMismatch,
    UnknownUnit,
    UnitConflict,
    KeyCollision,
    UnknownOperation,
    InvalidParams,
    CurrencyUnavailable,
    SemanticFallback,
    ExportFailure,
}

impl DiagnosticKind {
    pub fn for_unit_error(error: &UnitError) -> DiagnosticKind {
        match error {
            UnitError::DimensionMismatch { .. } | UnitError::NoTarget(_) => {
                DiagnosticKind::DimensionMismatch
            }
            UnitError::UnknownUnit(_) => DiagnosticKind::UnknownUnit,
            UnitError::Conflict { .. } | UnitError::InvalidDefinition { .. } => {
                DiagnosticKind::UnitConflict
            }
        }
    }
}

/// A per-field or per-step problem that did not stop the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Input index of the document, absent for batch-level problems such as exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

impl Diagnostic {
    /// A problem that belongs to the batch rather than one document.
    pub fn batch(kind: DiagnosticKind, step: usize, op: &str, message: impl Into<String>) -> Self {
        Diagnostic {
            document: None,
            step: Some(step),
            op: Some(op.to_string()),
            kind,
            path: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.document {
            Some(document) => write!(f, "doc {}", document)?,
            None => f.write_str("batch")?,
        }
        if let (Some(step), Some(op)) = (self.step, &self.op) {
            write!(f, " step {} ({})", step, op)?;
        }
        if let Some(path) = &self.path {
            write!(f, " at {}", path)?;
        }
        write!(f, ": {:?}: {}", self.kind, self.message)
    }
}
