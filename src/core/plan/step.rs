use crate::core::filters::Comparator;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The fixed operation vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    RenameColumns,
    FormatDate,
    TranslateValues,
    ConvertUnits,
    FilterEquals,
    FilterContains,
    FilterCompare,
    FilterBetween,
    CurrencyTo,
    Export,
}

impl OpKind {
    pub const ALL: [OpKind; 10] = [
        OpKind::RenameColumns,
        OpKind::FormatDate,
        OpKind::TranslateValues,
        OpKind::ConvertUnits,
        OpKind::FilterEquals,
        OpKind::FilterContains,
        OpKind::FilterCompare,
        OpKind::FilterBetween,
        OpKind::CurrencyTo,
        OpKind::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::RenameColumns => "rename_columns",
            OpKind::FormatDate => "format_date",
            OpKind::TranslateValues => "translate_values",
            OpKind::ConvertUnits => "convert_units",
            OpKind::FilterEquals => "filter_equals",
            OpKind::FilterContains => "filter_contains",
            OpKind::FilterCompare => "filter_compare",
            OpKind::FilterBetween => "filter_between",
            OpKind::CurrencyTo => "currency_to",
            OpKind::Export => "export",
        }
    }

    pub fn from_name(name: &str) -> Option<OpKind> {
        OpKind::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    pub fn is_filter(&self) -> bool {
        matches!(
            self,
            OpKind::FilterEquals
                | OpKind::FilterContains
                | OpKind::FilterCompare
                | OpKind::FilterBetween
        )
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Param names accepted for the comparator of `filter_compare`.
pub const COMPARATOR_KEYS: [&str; 3] = ["cmp", "operator", "comparator"];

/// One plan step: an op name plus its free-form params.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub op: String,
    pub params: Map<String, Value>,
}

impl Step {
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            params: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn kind(&self) -> Option<OpKind> {
        OpKind::from_name(&self.op)
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Non-empty trimmed string param.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// First non-empty string among several aliases.
    pub fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.str_param(key))
    }

    /// Column names from `columns`, `fields` or `column`, as a list.
    pub fn columns(&self) -> Vec<String> {
        for key in ["columns", "fields", "column"] {
            match self.params.get(key) {
                Some(Value::Array(items)) => {
                    let names: Vec<String> = items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                    if !names.is_empty() {
                        return names;
                    }
                }
                Some(Value::String(name)) if !name.trim().is_empty() => {
                    return vec![name.trim().to_string()];
                }
                _ => {}
            }
        }
        Vec::new()
    }

    pub fn comparator(&self) -> Option<&str> {
        self.first_str(&COMPARATOR_KEYS)
    }

    /// Assemble a step from every `op` value seen plus the remaining params.
    ///
    /// With several `op` values the vocabulary name wins and a comparator-looking
    /// leftover becomes the `cmp` param. A lone comparator op is read as `filter_compare`.
    fn from_parts(ops: Vec<String>, mut params: Map<String, Value>) -> Result<Step, String> {
        if ops.is_empty() {
            return Err("step is missing the `op` key".to_string());
        }
        let has_comparator = |params: &Map<String, Value>| {
            COMPARATOR_KEYS.iter().any(|key| params.contains_key(*key))
        };

        let known = ops.iter().position(|op| OpKind::from_name(op).is_some());
        let op = match known {
            Some(index) => {
                let op = ops[index].clone();
                for (i, other) in ops.iter().enumerate() {
                    if i != index && other.parse::<Comparator>().is_ok() && !has_comparator(&params) {
                        params.insert("cmp".to_string(), Value::String(other.clone()));
                    }
                }
                op
            }
            None if ops.len() == 1 && ops[0].parse::<Comparator>().is_ok() => {
                if !has_comparator(&params) {
                    params.insert("cmp".to_string(), Value::String(ops[0].clone()));
                }
                OpKind::FilterCompare.as_str().to_string()
            }
            None => ops[0].clone(),
        };
        Ok(Step { op, params })
    }

    /// Build from an already-parsed JSON object.
    pub fn from_value(value: &Value) -> Result<Step, String> {
        let object = value
            .as_object()
            .ok_or_else(|| "step must be a JSON object".to_string())?;
        let mut ops = Vec::new();
        let mut params = Map::new();
        for (key, value) in object {
            if key == "op" {
                let op = value
                    .as_str()
                    .ok_or_else(|| format!("op must be a string, got {}", value))?;
                ops.push(op.to_string());
            } else {
                params.insert(key.clone(), value.clone());
            }
        }
        Step::from_parts(ops, params)
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.params.len() + 1))?;
        map.serialize_entry("op", &self.op)?;
        for (key, value) in &self.params {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StepVisitor;

        impl<'de> Visitor<'de> for StepVisitor {
            type Value = Step;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a step object with an `op` key")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Step, A::Error> {
                let mut ops = Vec::new();
                let mut params = Map::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    if key == "op" {
                        match value {
                            Value::String(op) => ops.push(op),
                            other => {
                                return Err(de::Error::custom(format!(
                                    "op must be a string, got {}",
                                    other
                                )))
                            }
                        }
                    } else {
                        params.insert(key, value);
                    }
                }
                Step::from_parts(ops, params).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_map(StepVisitor)
    }
}
