#![allow(clippy::result_large_err)]

use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::operation::{OperationRegistry, StepContext, Verdict};
use super::operations::convert_units::register_custom_units;
use super::operations::export::ExportTarget;
use super::{OpKind, Plan};
use crate::core::document::normalize::{cleanup_candidates, post_pass, pre_pass};
use crate::core::document::resolver::navigate_mut;
use crate::core::environment::Environment;
use crate::core::units::ConversionRecord;
use crate::utils::atomic_write;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Decimal places used by the numeric post-pass.
const POST_PASS_PLACES: usize = 2;

/// Result of running a plan over a batch.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub execution_id: Uuid,
    /// Surviving documents, in input order.
    pub documents: Vec<Value>,
    pub plan: Plan,
    /// Input indices of the documents a filter rejected.
    pub dropped: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
    pub conversions: Vec<ConversionRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

struct DocumentOutcome {
    index: usize,
    document: Option<Value>,
    diagnostics: Vec<Diagnostic>,
    conversions: Vec<ConversionRecord>,
}

/// Applies plans to documents. Cheap to clone; share one per environment.
#[derive(Clone)]
pub struct PlanExecutor {
    registry: OperationRegistry,
    env: Arc<Environment>,
}

impl PlanExecutor {
    pub fn new(env: Arc<Environment>) -> Self {
        Self::with_registry(OperationRegistry::with_builtins(), env)
    }

    pub fn with_registry(registry: OperationRegistry, env: Arc<Environment>) -> Self {
        Self { registry, env }
    }

    pub fn env(&self) -> &Arc<Environment> {
        &self.env
    }

    /// Register every custom unit the plan defines before any step runs.
    fn preregister_units(&self, plan: &Plan) {
        for step in plan.iter().filter(|s| s.kind() == Some(OpKind::ConvertUnits)) {
            let rejected = register_custom_units(step, self.env.units());
            if !rejected.is_empty() {
                tracing::warn!(count = rejected.len(), "plan defines conflicting custom units");
            }
        }
    }

    async fn cleanup_pass(&self, doc: &mut Value) {
        let max_chars = self.env.config().executor.cleanup_max_chars;
        for (path, text) in cleanup_candidates(doc, max_chars) {
            let cleaned = self.env.cleanup_text(&text).await;
            if cleaned != text {
                if let Some(slot) = navigate_mut(doc, &path) {
                    *slot = Value::String(cleaned);
                }
            }
        }
    }

    #[tracing::instrument(name = "document", skip_all, fields(document = index))]
    async fn run_document(&self, mut doc: Value, index: usize, plan: &Plan) -> DocumentOutcome {
        let mut ctx = StepContext::new(self.env.clone(), index);
        let config = &self.env.config().executor;

        pre_pass(&mut doc);
        if config.text_cleanup {
            self.cleanup_pass(&mut doc).await;
        }

        let mut kept = true;
        for (step_index, step) in plan.iter().enumerate() {
            ctx.enter_step(step_index, &step.op);
            let Some(operation) = self.registry.get(&step.op) else {
                ctx.diagnose(
                    DiagnosticKind::UnknownOperation,
                    None,
                    format!("unknown op '{}' skipped", step.op),
                );
                continue;
            };
            let is_filter = step.kind().is_some_and(|kind| kind.is_filter());

            let outcome = match operation.validate_params(step) {
                Ok(()) => operation.apply(&mut doc, step, &mut ctx).await,
                Err(err) => Err(err),
            };
            match outcome {
                Ok(Verdict::Keep) => {}
                Ok(Verdict::Drop) => {
                    kept = false;
                    break;
                }
                Err(err) if is_filter => {
                    tracing::debug!(op = %step.op, error = %err.message, "filter params invalid; dropping document");
                    kept = false;
                    break;
                }
                Err(err) => {
                    tracing::warn!(op = %step.op, error = %err.message, "step skipped");
                    ctx.diagnose(DiagnosticKind::InvalidParams, None, err.message);
                }
            }
        }

        if kept && config.numeric_format {
            post_pass(&mut doc, POST_PASS_PLACES, &config.decimal_separator);
        }

        DocumentOutcome {
            index,
            document: kept.then_some(doc),
            diagnostics: ctx.diagnostics,
            conversions: ctx.conversions,
        }
    }

    /// Run `plan` over a single document. `None` means a filter dropped it.
    pub async fn execute_one(&self, doc: Value, plan: &Plan) -> (Option<Value>, Vec<Diagnostic>) {
        self.preregister_units(plan);
        let outcome = self.run_document(doc, 0, plan).await;
        (outcome.document, outcome.diagnostics)
    }

    /// Run `plan` over a batch. Documents are independent and run concurrently up to
    /// `executor.parallel_limit`; survivors keep their input order.
    #[tracing::instrument(name = "plan", skip_all, fields(execution_id = tracing::field::Empty, steps = plan.len()))]
    pub async fn execute(&self, docs: Vec<Value>, plan: &Plan) -> ExecutionSummary {
        let started_at = Utc::now();
        let execution_id = Uuid::new_v4();
        let total = docs.len();
        tracing::Span::current().record("execution_id", tracing::field::display(execution_id));
        tracing::info!(documents = total, "executing plan");

        self.preregister_units(plan);
        let limit = self.env.config().executor.parallel_limit.max(1);
        let outcomes: Vec<DocumentOutcome> = stream::iter(docs.into_iter().enumerate())
            .map(|(index, doc)| self.run_document(doc, index, plan))
            .buffered(limit)
            .collect()
            .await;

        let mut summary = ExecutionSummary {
            execution_id,
            documents: Vec::with_capacity(total),
            plan: plan.clone(),
            dropped: Vec::new(),
            diagnostics: Vec::new(),
            conversions: Vec::new(),
            exports: Vec::new(),
            started_at,
            completed_at: started_at,
        };
        for outcome in outcomes {
            match outcome.document {
                Some(document) => summary.documents.push(document),
                None => summary.dropped.push(outcome.index),
            }
            summary.diagnostics.extend(outcome.diagnostics);
            summary.conversions.extend(outcome.conversions);
        }

        self.write_exports(plan, &mut summary);
        summary.completed_at = Utc::now();
        tracing::info!(
            kept = summary.documents.len(),
            dropped = summary.dropped.len(),
            diagnostics = summary.diagnostics.len(),
            conversions = summary.conversions.len(),
            "plan finished"
        );
        summary
    }

    fn write_exports(&self, plan: &Plan, summary: &mut ExecutionSummary) {
        let config = &self.env.config().executor;
        let export_dir = &config.export_dir;
        for (step_index, step) in plan.iter().enumerate() {
            if step.kind() != Some(OpKind::Export) {
                continue;
            }
            let target = ExportTarget::from_step(step);
            let path = if target.path.is_absolute() {
                target.path.clone()
            } else {
                export_dir.join(&target.path)
            };
            let written = target
                .format
                .serializer(config.csv_delimiter as u8)
                .serialize_batch(&summary.documents)
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    atomic_write(&path, &bytes).map_err(|e| match e.source {
                        Some(cause) => format!("{}: {}", e.message, cause),
                        None => e.message,
                    })
                });
            match written {
                Ok(()) => {
                    tracing::info!(path = %path.display(), documents = summary.documents.len(), "exported batch");
                    summary.exports.push(path);
                }
                Err(message) => {
                    tracing::warn!(path = %path.display(), error = %message, "export failed");
                    summary.diagnostics.push(Diagnostic::batch(
                        DiagnosticKind::ExportFailure,
                        step_index,
                        &step.op,
                        format!("{}: {}", path.display(), message),
                    ));
                }
            }
        }
    }
}
