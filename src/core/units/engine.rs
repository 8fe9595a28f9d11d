use super::detect::{detect, split_number_with_unit, Candidate, Shape};
use super::registry::profile;
use super::{Dimension, Quantity, UnitDef, UnitError, UnitRegistry};
use crate::core::document::numbers::{format_magnitude, number_value, parse_number, round_to};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// What a document's measurements should be converted into.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSpec {
    Single(UnitDef),
    PerDimension(HashMap<Dimension, UnitDef>),
}

impl TargetSpec {
    pub fn for_dimension(&self, dimension: Dimension) -> Option<&UnitDef> {
        match self {
            TargetSpec::Single(unit) => (unit.dimension == dimension).then_some(unit),
            TargetSpec::PerDimension(map) => map.get(&dimension),
        }
    }

    /// JSON description handed to the semantic converter.
    pub fn describe(&self) -> Value {
        match self {
            TargetSpec::Single(unit) => json!({"target_unit": unit.symbol}),
            TargetSpec::PerDimension(map) => {
                let mut to = Map::new();
                for dimension in Dimension::ALL {
                    if let Some(unit) = map.get(&dimension) {
                        to.insert(dimension.as_str().to_string(), json!(unit.symbol));
                    }
                }
                json!({ "to": to })
            }
        }
    }
}

/// One applied conversion, kept for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionRecord {
    pub document: usize,
    pub path: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedField {
    pub path: String,
    pub error: UnitError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    pub detected: usize,
    pub already_in_target: usize,
    pub converted: Vec<ConversionRecord>,
    pub skipped: Vec<SkippedField>,
}

impl ConversionReport {
    /// Nothing changed and nothing was already in the requested units.
    pub fn is_empty_pass(&self) -> bool {
        self.converted.is_empty() && self.already_in_target == 0
    }
}

/// A unit defined from free text, `1 name = amount unit`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDefinition {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

static EQUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:(\d+(?:[.,]\d+)?)\s*)?([a-záéíóúñü]{2,})\s*=\s*(\d+(?:[.,]\d+)?)\s*([a-zµμ°º/^²³0-9]+)",
    )
    .expect("valid regex")
});

static HOLDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:a|an|one|each|every|cada|un|una|1)\s+([a-záéíóúñü]{2,})\s+(?:holds|contains|weighs|measures|equals|is|has|tiene|pesa|mide|lleva|contiene|equivale\s+a|son|es\s+de)\s+(\d+(?:[.,]\d+)?)\s*([a-zµμ°º/^²³0-9]+)",
    )
    .expect("valid regex")
});

/// Extract custom unit definitions such as `"1 cajon = 10 kg"` or `"a crate holds 10 kg"`.
pub fn parse_definitions(text: &str) -> Vec<UnitDefinition> {
    let mut out = Vec::new();
    for caps in EQUATION.captures_iter(text) {
        let count = caps
            .get(1)
            .and_then(|m| parse_number(m.as_str()))
            .unwrap_or(1.0);
        if let Some(quantity) = parse_number(&caps[3]) {
            if count > 0.0 {
                out.push(UnitDefinition {
                    name: caps[2].to_lowercase(),
                    amount: quantity / count,
                    unit: caps[4].to_string(),
                });
            }
        }
    }
    for caps in HOLDS.captures_iter(text) {
        if let Some(amount) = parse_number(&caps[2]) {
            out.push(UnitDefinition {
                name: caps[1].to_lowercase(),
                amount,
                unit: caps[3].to_string(),
            });
        }
    }
    out
}

/// Parse a reference quantity given as `"10 kg"`, `"10kg"`, `10` plus a hint, or `[10, "kg"]`.
pub fn parse_reference_quantity(value: &Value, unit_hint: Option<&str>) -> Option<(f64, String)> {
    match value {
        Value::String(text) => split_number_with_unit(text).or_else(|| {
            let amount = parse_number(text)?;
            Some((amount, unit_hint?.to_string()))
        }),
        Value::Number(n) => Some((n.as_f64()?, unit_hint?.to_string())),
        Value::Array(parts) if parts.len() == 2 => {
            let amount = match &parts[0] {
                Value::Number(n) => n.as_f64()?,
                Value::String(s) => parse_number(s)?,
                _ => return None,
            };
            Some((amount, parts[1].as_str()?.to_string()))
        }
        _ => None,
    }
}

/// True when `candidate` has the same structure as `original`: same object keys,
/// same array lengths, and scalars only moving between strings and numbers.
pub fn same_shape(original: &Value, candidate: &Value) -> bool {
    match (original, candidate) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| same_shape(value, other)))
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_shape(x, y))
        }
        (Value::String(_) | Value::Number(_), Value::String(_) | Value::Number(_)) => true,
        (Value::Bool(_), Value::Bool(_)) | (Value::Null, Value::Null) => true,
        _ => false,
    }
}

pub struct UnitEngine<'a> {
    registry: &'a UnitRegistry,
    precision: usize,
}

impl<'a> UnitEngine<'a> {
    pub fn new(registry: &'a UnitRegistry, precision: usize) -> Self {
        Self {
            registry,
            precision,
        }
    }

    /// Resolve a profile name or a unit name.
    pub fn resolve_name(&self, name: &str) -> Result<TargetSpec, UnitError> {
        if let Some(targets) = profile(name) {
            let mut map = HashMap::new();
            for (dimension, symbol) in targets {
                let unit = self
                    .registry
                    .lookup(symbol)
                    .ok_or_else(|| UnitError::UnknownUnit(symbol.to_string()))?;
                map.insert(dimension, unit);
            }
            return Ok(TargetSpec::PerDimension(map));
        }
        self.registry
            .lookup(name)
            .map(TargetSpec::Single)
            .ok_or_else(|| UnitError::UnknownUnit(name.to_string()))
    }

    /// Resolve a `to` parameter: a unit or profile name, or a `{dimension: unit}` map.
    pub fn resolve_target(&self, spec: &Value) -> Result<TargetSpec, UnitError> {
        match spec {
            Value::String(name) => self.resolve_name(name),
            Value::Object(entries) => {
                let mut map = HashMap::new();
                for (key, value) in entries {
                    let symbol = value
                        .as_str()
                        .ok_or_else(|| UnitError::UnknownUnit(value.to_string()))?;
                    let unit = self
                        .registry
                        .lookup(symbol)
                        .ok_or_else(|| UnitError::UnknownUnit(symbol.to_string()))?;
                    let dimension = Dimension::from_name(key).unwrap_or(unit.dimension);
                    if dimension != unit.dimension {
                        return Err(UnitError::DimensionMismatch {
                            from: key.clone(),
                            from_dimension: dimension,
                            to: unit.symbol.clone(),
                            to_dimension: unit.dimension,
                        });
                    }
                    map.insert(dimension, unit);
                }
                Ok(TargetSpec::PerDimension(map))
            }
            other => Err(UnitError::UnknownUnit(other.to_string())),
        }
    }

    pub fn convert_quantity(&self, quantity: &Quantity, target: &TargetSpec) -> Result<Quantity, UnitError> {
        let unit = target
            .for_dimension(quantity.dimension())
            .ok_or_else(|| mismatch(quantity, target))?;
        let converted = quantity.convert_to(unit)?;
        Ok(Quantity::new(
            round_to(converted.magnitude, self.precision as u32),
            converted.unit,
        ))
    }

    /// Convert every detected measurement in `doc`, restricted to `columns` when any match.
    pub fn convert_document(
        &self,
        doc: &mut Value,
        target: &TargetSpec,
        columns: &[String],
    ) -> ConversionReport {
        let mut candidates = detect(doc, self.registry);
        if !columns.is_empty() && candidates.iter().any(|c| c.matches_columns(columns)) {
            candidates.retain(|c| c.matches_columns(columns));
        }
        let explicit = !columns.is_empty();

        let mut report = ConversionReport {
            detected: candidates.len(),
            ..Default::default()
        };

        for candidate in candidates.iter().rev() {
            let path = candidate.field.path();
            let Some(unit) = candidate.unit.clone() else {
                if candidate.shape == Shape::Pair || explicit {
                    report.skipped.push(SkippedField {
                        path,
                        error: UnitError::UnknownUnit(candidate.unit_token.clone()),
                    });
                } else {
                    tracing::debug!(path = %path, token = %candidate.unit_token, "ignoring unrecognized unit token");
                }
                continue;
            };

            let quantity = Quantity::new(candidate.magnitude, unit);
            let converted = match self.convert_quantity(&quantity, target) {
                Ok(converted) => converted,
                Err(error) => {
                    report.skipped.push(SkippedField { path, error });
                    continue;
                }
            };
            if converted.unit.symbol == quantity.unit.symbol {
                report.already_in_target += 1;
                continue;
            }

            let to = format!(
                "{} {}",
                format_magnitude(converted.magnitude, self.precision),
                converted.unit.symbol
            );
            let final_path = self.write_back(doc, candidate, &converted);
            tracing::info!(path = %final_path, from = %candidate.describe(self.precision), to = %to, "converted measurement");
            report.converted.push(ConversionRecord {
                document: 0,
                path: final_path,
                from: candidate.describe(self.precision),
                to,
            });
        }
        report.converted.reverse();
        report
    }

    fn write_back(&self, doc: &mut Value, candidate: &Candidate, converted: &Quantity) -> String {
        let text = format_magnitude(converted.magnitude, self.precision);
        let magnitude_value = |original: Option<&Value>| -> Value {
            match original {
                Some(Value::Number(_)) => {
                    number_value(converted.magnitude).unwrap_or_else(|| Value::String(text.clone()))
                }
                _ => Value::String(text.clone()),
            }
        };

        match candidate.shape {
            Shape::Pair => {
                let value = magnitude_value(candidate.field.get(doc));
                candidate.field.set(doc, value);
                if let Some(unit_field) = &candidate.unit_field {
                    unit_field.set(doc, Value::String(converted.unit.symbol.clone()));
                }
                candidate.field.path()
            }
            Shape::Embedded => {
                candidate.field.set(
                    doc,
                    Value::String(format!("{} {}", text, converted.unit.symbol)),
                );
                candidate.field.path()
            }
            Shape::Suffixed => {
                let value = magnitude_value(candidate.field.get(doc));
                candidate.field.set(doc, value);
                let Some((stem, separator)) = candidate.stem.as_ref() else {
                    return candidate.field.path();
                };
                let suffix = converted.unit.symbol.replace('^', "");
                match candidate
                    .field
                    .rename(doc, &format!("{}{}{}", stem, separator, suffix))
                {
                    Ok(renamed) => renamed.path(),
                    Err(err) => {
                        tracing::debug!(error = %err, "kept suffixed key after conversion");
                        candidate.field.path()
                    }
                }
            }
        }
    }
}

fn mismatch(quantity: &Quantity, target: &TargetSpec) -> UnitError {
    match target {
        TargetSpec::Single(unit) => UnitError::DimensionMismatch {
            from: quantity.unit.symbol.clone(),
            from_dimension: quantity.dimension(),
            to: unit.symbol.clone(),
            to_dimension: unit.dimension,
        },
        TargetSpec::PerDimension(_) => UnitError::NoTarget(quantity.dimension()),
    }
}
