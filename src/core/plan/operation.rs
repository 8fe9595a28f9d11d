#![allow(clippy::result_large_err)]

use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::step::Step;
use crate::core::environment::Environment;
use crate::core::error::{AppError, ErrorCode};
use crate::core::units::ConversionRecord;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of one step on one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Drop,
}

/// Per-document state handed to each step.
pub struct StepContext {
    pub env: Arc<Environment>,
    pub document_index: usize,
    pub step_index: usize,
    pub op: String,
    pub diagnostics: Vec<Diagnostic>,
    pub conversions: Vec<ConversionRecord>,
}

impl StepContext {
    pub fn new(env: Arc<Environment>, document_index: usize) -> Self {
        Self {
            env,
            document_index,
            step_index: 0,
            op: String::new(),
            diagnostics: Vec::new(),
            conversions: Vec::new(),
        }
    }

    pub fn enter_step(&mut self, index: usize, op: &str) {
        self.step_index = index;
        self.op = op.to_string();
    }

    pub fn diagnose(&mut self, kind: DiagnosticKind, path: Option<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            document: Some(self.document_index),
            step: Some(self.step_index),
            op: (!self.op.is_empty()).then(|| self.op.clone()),
            kind,
            path,
            message: message.into(),
        };
        tracing::debug!(diagnostic = %diagnostic, "recorded diagnostic");
        self.diagnostics.push(diagnostic);
    }

    pub fn record_conversion(&mut self, mut record: ConversionRecord) {
        record.document = self.document_index;
        self.conversions.push(record);
    }
}

/// Error for a step whose params cannot be used.
pub fn invalid_params(op: &str, message: impl Into<String>) -> AppError {
    AppError::new(ErrorCode::InvalidStep, message).with_context("op", op)
}

/// A named plan step implementation.
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    /// Op name used in plans.
    fn name(&self) -> &'static str;

    /// Validate params ahead of execution.
    fn validate_params(&self, step: &Step) -> Result<(), AppError>;

    /// Apply the step to one document.
    async fn apply(
        &self,
        doc: &mut Value,
        step: &Step,
        ctx: &mut StepContext,
    ) -> Result<Verdict, AppError>;
}

/// Builder used to register operations before execution.
pub struct OperationRegistryBuilder {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl Default for OperationRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationRegistryBuilder {
    pub fn new() -> Self {
        Self {
            operations: HashMap::new(),
        }
    }

    pub fn register<T: Operation>(&mut self, operation: T) -> &mut Self {
        let name = operation.name();
        if self.operations.contains_key(name) {
            panic!("duplicate operation registered: {}", name);
        }
        self.operations.insert(name.to_string(), Arc::new(operation));
        self
    }

    pub fn build(self) -> OperationRegistry {
        OperationRegistry {
            inner: Arc::new(self.operations),
        }
    }
}

/// Immutable registry available during plan execution.
#[derive(Clone)]
pub struct OperationRegistry {
    inner: Arc<HashMap<String, Arc<dyn Operation>>>,
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl OperationRegistry {
    pub fn builder() -> OperationRegistryBuilder {
        OperationRegistryBuilder::new()
    }

    /// Registry holding every built-in operation.
    pub fn with_builtins() -> Self {
        let mut builder = OperationRegistryBuilder::new();
        super::operations::register_builtins(&mut builder);
        builder.build()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.inner.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inner.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
