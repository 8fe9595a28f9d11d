#![allow(clippy::result_large_err)]

use crate::core::document::nkey;
use crate::core::document::resolver::{render_path, PathSegment};
use crate::core::document::value_to_text;
use crate::core::error::AppError;
use crate::core::plan::diagnostics::DiagnosticKind;
use crate::core::plan::operation::{invalid_params, Operation, StepContext, Verdict};
use crate::core::plan::Step;
use crate::core::units::engine::{
    parse_definitions, parse_reference_quantity, same_shape, UnitDefinition,
};
use crate::core::units::detect::detect;
use crate::core::units::{
    ConversionRecord, Dimension, Quantity, TargetSpec, UnitDef, UnitError, UnitRegistry,
};
use async_trait::async_trait;
use serde_json::Value;
use std::ops::RangeInclusive;

const TARGET_KEYS: [&str; 4] = ["to", "target_unit", "target", "unit"];

/// Multiples of the base unit a model-supplied definition may claim.
const GUESS_FACTOR_RANGE: RangeInclusive<f64> = 1e-9..=1e9;

/// Converts every detected measurement to the requested unit, profile or per-dimension map.
pub struct ConvertUnitsOperation;

impl Default for ConvertUnitsOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvertUnitsOperation {
    pub fn new() -> Self {
        Self
    }

    fn target_param(step: &Step) -> Option<&Value> {
        TARGET_KEYS.iter().find_map(|key| match step.param(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => step.param(key),
            Some(Value::Object(map)) if !map.is_empty() => step.param(key),
            _ => None,
        })
    }

    /// Ask the semantic service what an unknown unit means and register the answer
    /// once it proves usable on `doc`: a plausible factor over a linear base unit, and
    /// at least one measurement in the document that converts into it.
    async fn define_with_semantic(
        &self,
        name: &str,
        doc: &Value,
        ctx: &mut StepContext,
    ) -> Result<UnitDef, UnitError> {
        let env = ctx.env.clone();
        let guess = match env.semantic().define_unit(name).await {
            Ok(Some(guess)) => guess,
            Ok(None) => return Err(UnitError::UnknownUnit(name.to_string())),
            Err(err) => {
                tracing::debug!(unit = %name, error = %err, "semantic unit definition unavailable");
                return Err(UnitError::UnknownUnit(name.to_string()));
            }
        };
        let base = env
            .units()
            .lookup(&guess.base_unit)
            .ok_or_else(|| UnitError::UnknownUnit(guess.base_unit.clone()))?;
        let rejected = |reason: String| UnitError::InvalidDefinition {
            name: name.to_string(),
            reason,
        };
        if !GUESS_FACTOR_RANGE.contains(&guess.factor) {
            return Err(rejected(format!("implausible factor {} {}", guess.factor, guess.base_unit)));
        }
        if base.offset != 0.0 || base.dimension == Dimension::Dimensionless {
            return Err(rejected(format!("'{}' cannot anchor a unit definition", guess.base_unit)));
        }

        let def = UnitDef::new(nkey(name), base.dimension, guess.factor * base.factor);
        let trial = detect(doc, env.units())
            .into_iter()
            .filter_map(|candidate| candidate.unit.map(|unit| Quantity::new(candidate.magnitude, unit)))
            .find(|quantity| quantity.dimension() == def.dimension)
            .ok_or_else(|| {
                rejected(format!(
                    "defined as {}, but the document holds no {} measurement",
                    base.dimension, base.dimension
                ))
            })?
            .convert_to(&def)?;
        if !trial.magnitude.is_finite() {
            return Err(rejected(format!("trial conversion produced {}", trial.magnitude)));
        }
        let registered = env.units().register(name, def)?;
        tracing::info!(unit = %name, factor = guess.factor, base = %guess.base_unit, "registered semantic unit definition");
        Ok(registered)
    }

    async fn resolve(
        &self,
        target: &Value,
        doc: &Value,
        ctx: &mut StepContext,
    ) -> Result<TargetSpec, UnitError> {
        let env = ctx.env.clone();
        let engine = env.unit_engine();
        match engine.resolve_target(target) {
            Err(UnitError::UnknownUnit(name)) if target.is_string() => {
                self.define_with_semantic(&name, doc, ctx).await?;
                engine.resolve_target(target)
            }
            other => other,
        }
    }

    /// Hand the whole document to the semantic converter; accept only a same-shape reply.
    async fn semantic_fallback(&self, doc: &mut Value, target: &TargetSpec, ctx: &mut StepContext) {
        let env = ctx.env.clone();
        let reply = match env.semantic().convert_document(doc, &target.describe()).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::debug!(error = %err, "semantic unit conversion unavailable");
                return;
            }
        };
        if !same_shape(doc, &reply) {
            ctx.diagnose(
                DiagnosticKind::SemanticFallback,
                None,
                "semantic conversion reply changed the document shape and was discarded",
            );
            return;
        }
        let mut changes = Vec::new();
        changed_leaves(doc, &reply, &mut Vec::new(), &mut changes);
        if changes.is_empty() {
            return;
        }
        for (path, from, to) in changes {
            tracing::info!(path = %path, from = %from, to = %to, "converted measurement (semantic)");
            ctx.record_conversion(ConversionRecord {
                document: 0,
                path,
                from,
                to,
            });
        }
        *doc = reply;
    }
}

/// Every custom unit a step defines through `custom_units`, `conversion_value` or
/// a free-text `instruction`.
pub fn custom_definitions(step: &Step) -> Vec<UnitDefinition> {
    let mut out = Vec::new();

    match step.param("custom_units") {
        Some(Value::Object(entries)) => {
            for (name, spec) in entries {
                if let Some(def) = definition_from(name, spec) {
                    out.push(def);
                }
            }
        }
        Some(Value::Array(entries)) => {
            for entry in entries {
                match entry {
                    Value::String(text) => out.extend(parse_definitions(text)),
                    Value::Object(fields) => {
                        let name = fields.get("name").and_then(Value::as_str);
                        if let Some(def) = name.and_then(|n| definition_from(n, entry)) {
                            out.push(def);
                        }
                    }
                    _ => {}
                }
            }
        }
        Some(Value::String(text)) => out.extend(parse_definitions(text)),
        _ => {}
    }

    if let Some(value) = step.param("conversion_value") {
        let name = step.first_str(&["target_unit", "to", "unit"]);
        let hint = step.str_param("conversion_unit");
        if let (Some(name), Some((amount, unit))) = (name, parse_reference_quantity(value, hint)) {
            out.push(UnitDefinition {
                name: name.to_lowercase(),
                amount,
                unit,
            });
        }
    }

    if let Some(text) = step.str_param("instruction") {
        out.extend(parse_definitions(text));
    }
    out
}

fn definition_from(name: &str, spec: &Value) -> Option<UnitDefinition> {
    let (amount, unit) = match spec {
        Value::Object(fields) => {
            let amount = fields.get("amount").or_else(|| fields.get("value"))?;
            let hint = fields.get("unit").and_then(Value::as_str);
            parse_reference_quantity(amount, hint)?
        }
        other => parse_reference_quantity(other, None)?,
    };
    Some(UnitDefinition {
        name: name.trim().to_lowercase(),
        amount,
        unit,
    })
}

/// Register the custom units of `step`. Returns the definitions that were rejected.
pub fn register_custom_units(step: &Step, registry: &UnitRegistry) -> Vec<(String, UnitError)> {
    let mut rejected = Vec::new();
    for def in custom_definitions(step) {
        if let Err(err) = registry.define(&def.name, def.amount, &def.unit) {
            tracing::warn!(unit = %def.name, error = %err, "custom unit rejected");
            rejected.push((def.name, err));
        }
    }
    rejected
}

fn changed_leaves(
    before: &Value,
    after: &Value,
    path: &mut Vec<PathSegment>,
    out: &mut Vec<(String, String, String)>,
) {
    match (before, after) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, value) in a {
                if let Some(other) = b.get(key) {
                    path.push(PathSegment::Key(key.clone()));
                    changed_leaves(value, other, path, out);
                    path.pop();
                }
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            for (index, (x, y)) in a.iter().zip(b).enumerate() {
                path.push(PathSegment::Index(index));
                changed_leaves(x, y, path, out);
                path.pop();
            }
        }
        (x, y) if x != y => out.push((render_path(path), value_to_text(x), value_to_text(y))),
        _ => {}
    }
}

#[async_trait]
impl Operation for ConvertUnitsOperation {
    fn name(&self) -> &'static str {
        "convert_units"
    }

    fn validate_params(&self, step: &Step) -> Result<(), AppError> {
        if Self::target_param(step).is_none() {
            return Err(invalid_params(
                self.name(),
                "convert_units requires a target unit (`to` or `target_unit`)",
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
        let Some(target) = Self::target_param(step).cloned() else {
            return Ok(Verdict::Keep);
        };

        let env = ctx.env.clone();
        for (name, err) in register_custom_units(step, env.units()) {
            ctx.diagnose(DiagnosticKind::for_unit_error(&err), None, format!("{}: {}", name, err));
        }

        let spec = match self.resolve(&target, doc, ctx).await {
            Ok(spec) => spec,
            Err(err) => {
                ctx.diagnose(DiagnosticKind::for_unit_error(&err), None, err.to_string());
                return Ok(Verdict::Keep);
            }
        };

        let columns = step.columns();
        let report = env.unit_engine().convert_document(doc, &spec, &columns);
        for skipped in &report.skipped {
            ctx.diagnose(
                DiagnosticKind::for_unit_error(&skipped.error),
                Some(skipped.path.clone()),
                skipped.error.to_string(),
            );
        }
        let empty_pass = report.is_empty_pass();
        for record in report.converted {
            ctx.record_conversion(record);
        }

        if empty_pass && env.config().units.semantic_fallback {
            self.semantic_fallback(doc, &spec, ctx).await;
        }
        Ok(Verdict::Keep)
    }
}
