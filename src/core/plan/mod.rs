//! Plans, the operation registry and the batch executor.

pub mod diagnostics;
pub mod executor;
pub mod operation;
pub mod operations;
pub mod step;

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use executor::{ExecutionSummary, PlanExecutor};
pub use operation::{Operation, OperationRegistry, OperationRegistryBuilder, StepContext, Verdict};
pub use step::{OpKind, Step};

use serde::{Deserialize, Deserializer, Serialize};

/// Ordered, immutable list of steps. Serializes as a bare JSON array and also
/// accepts the `{"plan": [...]}` wrapper on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Plan {
    steps: Vec<Step>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlanRepr {
    Steps(Vec<Step>),
    Wrapped { plan: Vec<Step> },
}

impl<'de> Deserialize<'de> for Plan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let steps = match PlanRepr::deserialize(deserializer)? {
            PlanRepr::Steps(steps) | PlanRepr::Wrapped { plan: steps } => steps,
        };
        Ok(Plan { steps })
    }
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    /// Steps whose op is in the vocabulary, plus the names of those dropped.
    pub fn known_only(self) -> (Plan, Vec<String>) {
        let (known, unknown): (Vec<Step>, Vec<Step>) =
            self.steps.into_iter().partition(|step| step.kind().is_some());
        (
            Plan { steps: known },
            unknown.into_iter().map(|step| step.op).collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
