//! Natural-language instruction to [`Plan`] compilation.
//!
//! The semantic compiler is tried first; a plan with at least one valid step is used
//! as is. Otherwise the rule compiler's plan is used. The two are never merged.

#![allow(clippy::result_large_err)]

pub mod rules;
pub mod semantic;

pub use rules::RuleCompiler;
pub use semantic::plan_from_reply;

use crate::core::environment::Environment;
use crate::core::error::{AppError, ErrorCode};
use crate::core::plan::Plan;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    Semantic,
    Rules,
}

impl fmt::Display for PlanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanSource::Semantic => f.write_str("semantic"),
            PlanSource::Rules => f.write_str("rules"),
        }
    }
}

/// Why a step was (or was not) emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub op: String,
    pub why: String,
    #[serde(default)]
    pub confidence: f64,
}

impl Decision {
    pub fn new(op: &str, why: impl Into<String>, confidence: f64) -> Self {
        Self {
            op: op.to_string(),
            why: why.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompiledPlan {
    pub plan: Plan,
    pub source: PlanSource,
    pub decisions: Vec<Decision>,
    /// Ops the semantic reply named that are outside the vocabulary.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discarded_ops: Vec<String>,
}

pub struct InstructionCompiler {
    env: Arc<Environment>,
    rules: RuleCompiler,
    rules_only: bool,
}

impl InstructionCompiler {
    pub fn new(env: Arc<Environment>) -> Self {
        Self {
            env,
            rules: RuleCompiler::new(),
            rules_only: false,
        }
    }

    /// Skip the semantic service entirely.
    pub fn rules_only(mut self, rules_only: bool) -> Self {
        self.rules_only = rules_only;
        self
    }

    pub async fn compile(
        &self,
        instruction: &str,
        context: Option<&Value>,
    ) -> Result<CompiledPlan, AppError> {
        if !self.rules_only {
            match self
                .env
                .semantic()
                .compile_instruction(instruction, context)
                .await
            {
                Ok(reply) => {
                    let (plan, decisions, discarded_ops) = plan_from_reply(&reply);
                    if !discarded_ops.is_empty() {
                        tracing::warn!(ops = ?discarded_ops, "semantic plan named unknown ops");
                    }
                    if !plan.is_empty() {
                        tracing::info!(steps = plan.len(), "using semantic plan");
                        return Ok(CompiledPlan {
                            plan,
                            source: PlanSource::Semantic,
                            decisions,
                            discarded_ops,
                        });
                    }
                    tracing::debug!("semantic plan empty; falling back to rules");
                }
                Err(err) => {
                    tracing::debug!(error = %err, "semantic compiler unavailable; falling back to rules");
                }
            }
        }

        let (plan, decisions) = self.rules.compile(instruction);
        if plan.is_empty() {
            return Err(AppError::new(
                ErrorCode::NoPlan,
                "no compiler produced a plan for the instruction",
            )
            .with_context("instruction", instruction)
            .with_suggestion("name the operation explicitly, e.g. \"convertir largo a mm\""));
        }
        tracing::info!(steps = plan.len(), "using rule-based plan");
        Ok(CompiledPlan {
            plan,
            source: PlanSource::Rules,
            decisions,
            discarded_ops: Vec::new(),
        })
    }
}
