//! Locating convertible measurements inside a document.

use super::{UnitDef, UnitRegistry};
use crate::core::document::numbers::{format_magnitude, is_pure_numeric_like, parse_number};
use crate::core::document::resolver::walk_objects;
use crate::core::document::{nkey, KeyMatch};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Field names that hold the magnitude half of a value/unit pair.
pub const VALUE_KEYS: &[&str] = &[
    "valor", "value", "amount", "qty", "quantity", "medida", "measure", "size", "length",
    "weight", "mass", "cantidad", "longitud",
];

/// Field names that hold the unit half of a value/unit pair.
pub const UNIT_KEYS: &[&str] = &[
    "unidad",
    "unit",
    "units",
    "uom",
    "measure_unit",
    "unidad_medida",
];

static NUMBER_WITH_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s*([+-]?\d+(?:[.,]\d+)*)\s*((?:[°º]\s?)?[A-Za-zµμ"'][\wµμ°º^²³/.']*)\s*$"#,
    )
    .expect("valid regex")
});

static UNIT_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?)([_\-])(km|m|cm|mm|µm|um|kg|g|mg|lb|lbs|oz|l|lt|ml|m3|cm3|mm3|in|ft)$")
        .expect("valid regex")
});

/// Which of the three supported layouts a measurement was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `{"valor": 12, "unidad": "cm"}`
    Pair,
    /// `{"largo": "12 cm"}`
    Embedded,
    /// `{"largo_cm": 12}`
    Suffixed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub shape: Shape,
    pub field: KeyMatch,
    pub unit_field: Option<KeyMatch>,
    pub magnitude: f64,
    pub unit_token: String,
    pub unit: Option<UnitDef>,
    /// Key stem and separator for [`Shape::Suffixed`] fields, e.g. `("largo", "_")`.
    pub stem: Option<(String, String)>,
}

impl Candidate {
    pub fn describe(&self, precision: usize) -> String {
        format!(
            "{} {}",
            format_magnitude(self.magnitude, precision),
            self.unit_token
        )
    }

    /// Whether this candidate belongs to one of the requested logical columns.
    pub fn matches_columns(&self, columns: &[String]) -> bool {
        let key = nkey(&self.field.key);
        columns.iter().any(|column| {
            let wanted = nkey(column);
            wanted == key
                || self
                    .stem
                    .as_ref()
                    .is_some_and(|(stem, _)| nkey(stem) == wanted)
        })
    }
}

fn plain_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if is_pure_numeric_like(s) => parse_number(s),
        _ => None,
    }
}

/// Split `"12,5 cm"` into magnitude and unit token.
pub fn split_number_with_unit(text: &str) -> Option<(f64, String)> {
    let caps = NUMBER_WITH_UNIT.captures(text)?;
    let magnitude = parse_number(&caps[1])?;
    let unit = caps[2].trim().trim_end_matches('.').to_string();
    if unit.is_empty() {
        return None;
    }
    Some((magnitude, unit))
}

/// Every measurement found in `doc`, in document order.
pub fn detect(doc: &Value, registry: &UnitRegistry) -> Vec<Candidate> {
    let mut found = Vec::new();
    walk_objects(doc, &mut |path, map| {
        let unit_field = map.iter().find_map(|(key, value)| {
            let text = value.as_str()?.trim();
            (UNIT_KEYS.contains(&nkey(key).as_str()) && !text.is_empty())
                .then(|| (key.clone(), text.to_string()))
        });

        for (key, value) in map {
            let folded = nkey(key);
            if let Some((unit_key, unit_text)) = &unit_field {
                if unit_key == key {
                    continue;
                }
                if VALUE_KEYS.contains(&folded.as_str()) {
                    if let Some(magnitude) = plain_number(value) {
                        found.push(Candidate {
                            shape: Shape::Pair,
                            field: KeyMatch::new(path.to_vec(), key.clone()),
                            unit_field: Some(KeyMatch::new(path.to_vec(), unit_key.clone())),
                            magnitude,
                            unit_token: unit_text.clone(),
                            unit: registry.lookup(unit_text),
                            stem: None,
                        });
                        continue;
                    }
                }
            }

            if let Some(text) = value.as_str() {
                if let Some((magnitude, unit_token)) = split_number_with_unit(text) {
                    let unit = registry.lookup(&unit_token);
                    found.push(Candidate {
                        shape: Shape::Embedded,
                        field: KeyMatch::new(path.to_vec(), key.clone()),
                        unit_field: None,
                        magnitude,
                        unit_token,
                        unit,
                        stem: None,
                    });
                    continue;
                }
            }

            if let Some(caps) = UNIT_SUFFIX.captures(key) {
                if let Some(magnitude) = plain_number(value) {
                    let unit_token = caps[3].to_string();
                    found.push(Candidate {
                        shape: Shape::Suffixed,
                        field: KeyMatch::new(path.to_vec(), key.clone()),
                        unit_field: None,
                        magnitude,
                        unit: registry.lookup(&unit_token),
                        unit_token,
                        stem: Some((caps[1].to_string(), caps[2].to_string())),
                    });
                }
            }
        }
    });
    found
}
