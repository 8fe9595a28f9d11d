#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::filters::{self, Comparator};
use crate::core::plan::operation::{invalid_params, Operation, StepContext, Verdict};
use crate::core::plan::Step;
use async_trait::async_trait;
use serde_json::Value;

fn required_columns(op: &str, step: &Step) -> Result<Vec<String>, AppError> {
    let columns = step.columns();
    if columns.is_empty() {
        return Err(invalid_params(op, format!("{} requires a column", op)));
    }
    Ok(columns)
}

fn operand<'a>(op: &str, step: &'a Step, keys: &[&str]) -> Result<&'a Value, AppError> {
    keys.iter()
        .find_map(|key| step.param(key).filter(|v| !v.is_null()))
        .ok_or_else(|| invalid_params(op, format!("{} requires `{}`", op, keys[0])))
}

fn verdict(kept: bool, step: &Step) -> Verdict {
    if kept {
        Verdict::Keep
    } else {
        tracing::debug!(op = %step.op, "document filtered out");
        Verdict::Drop
    }
}

pub struct FilterEqualsOperation;

impl Default for FilterEqualsOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterEqualsOperation {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Operation for FilterEqualsOperation {
    fn name(&self) -> &'static str {
        "filter_equals"
    }

    fn validate_params(&self, step: &Step) -> Result<(), AppError> {
        required_columns(self.name(), step)?;
        operand(self.name(), step, &["value", "equals"])?;
        Ok(())
    }

    async fn apply(
        &self,
        doc: &mut Value,
        step: &Step,
        _ctx: &mut StepContext,
    ) -> Result<Verdict, AppError> {
        let columns = required_columns(self.name(), step)?;
        let expected = operand(self.name(), step, &["value", "equals"])?;
        let kept = columns.iter().any(|c| filters::equals(doc, c, expected));
        Ok(verdict(kept, step))
    }
}

pub struct FilterContainsOperation;

impl Default for FilterContainsOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterContainsOperation {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Operation for FilterContainsOperation {
    fn name(&self) -> &'static str {
        "filter_contains"
    }

    fn validate_params(&self, step: &Step) -> Result<(), AppError> {
        required_columns(self.name(), step)?;
        operand(self.name(), step, &["value", "text", "contains"])?;
        Ok(())
    }

    async fn apply(
        &self,
        doc: &mut Value,
        step: &Step,
        _ctx: &mut StepContext,
    ) -> Result<Verdict, AppError> {
        let columns = required_columns(self.name(), step)?;
        let needle = operand(self.name(), step, &["value", "text", "contains"])?;
        let kept = columns.iter().any(|c| filters::contains(doc, c, needle));
        Ok(verdict(kept, step))
    }
}

pub struct FilterCompareOperation;

impl Default for FilterCompareOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCompareOperation {
    pub fn new() -> Self {
        Self
    }

    fn comparator(&self, step: &Step) -> Result<Comparator, AppError> {
        let raw = step
            .comparator()
            .ok_or_else(|| invalid_params(self.name(), "filter_compare requires a comparator"))?;
        raw.parse::<Comparator>()
            .map_err(|e| invalid_params(self.name(), e))
    }
}

#[async_trait]
impl Operation for FilterCompareOperation {
    fn name(&self) -> &'static str {
        "filter_compare"
    }

    fn validate_params(&self, step: &Step) -> Result<(), AppError> {
        required_columns(self.name(), step)?;
        self.comparator(step)?;
        operand(self.name(), step, &["value"])?;
        Ok(())
    }

    async fn apply(
        &self,
        doc: &mut Value,
        step: &Step,
        _ctx: &mut StepContext,
    ) -> Result<Verdict, AppError> {
        let columns = required_columns(self.name(), step)?;
        let comparator = self.comparator(step)?;
        let right = operand(self.name(), step, &["value"])?;
        let kept = columns
            .iter()
            .any(|c| filters::compare(doc, c, comparator, right));
        Ok(verdict(kept, step))
    }
}

pub struct FilterBetweenOperation;

impl Default for FilterBetweenOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterBetweenOperation {
    pub fn new() -> Self {
        Self
    }

    fn bounds<'a>(&self, step: &'a Step) -> Result<(&'a Value, &'a Value), AppError> {
        if let Some(Value::Array(range)) = step.param("range") {
            if let [low, high] = range.as_slice() {
                return Ok((low, high));
            }
        }
        let low = operand(self.name(), step, &["low", "min", "from", "start"])?;
        let high = operand(self.name(), step, &["high", "max", "to", "end"])?;
        Ok((low, high))
    }
}

#[async_trait]
impl Operation for FilterBetweenOperation {
    fn name(&self) -> &'static str {
        "filter_between"
    }

    fn validate_params(&self, step: &Step) -> Result<(), AppError> {
        required_columns(self.name(), step)?;
        self.bounds(step)?;
        Ok(())
    }

    async fn apply(
        &self,
        doc: &mut Value,
        step: &Step,
        _ctx: &mut StepContext,
    ) -> Result<Verdict, AppError> {
        let columns = required_columns(self.name(), step)?;
        let (low, high) = self.bounds(step)?;
        let kept = columns.iter().any(|c| filters::between(doc, c, low, high));
        Ok(verdict(kept, step))
    }
}
