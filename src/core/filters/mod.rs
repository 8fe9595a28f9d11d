//! Record predicates. Every predicate is existential over all occurrences of the
//! column; a missing column never matches.

use crate::core::dates::parse_date;
use crate::core::document::{find, nkey, value_as_number, value_to_text};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparator {
    pub fn holds(&self, left: f64, right: f64) -> bool {
        match self {
            Comparator::Lt => left < right,
            Comparator::Le => left <= right,
            Comparator::Gt => left > right,
            Comparator::Ge => left >= right,
            Comparator::Eq => (left - right).abs() < f64::EPSILON,
            Comparator::Ne => (left - right).abs() >= f64::EPSILON,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
        }
    }
}

impl FromStr for Comparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "<" | "lt" => Ok(Comparator::Lt),
            "<=" | "=<" | "le" | "lte" => Ok(Comparator::Le),
            ">" | "gt" => Ok(Comparator::Gt),
            ">=" | "=>" | "ge" | "gte" => Ok(Comparator::Ge),
            "=" | "==" | "eq" => Ok(Comparator::Eq),
            "!=" | "<>" | "ne" => Ok(Comparator::Ne),
            other => Err(format!("unknown comparator '{}'", other)),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn folded_values(doc: &Value, column: &str) -> Vec<String> {
    find(doc, column)
        .iter()
        .filter_map(|m| m.get(doc))
        .map(|v| nkey(&value_to_text(v)))
        .collect()
}

/// Case- and accent-insensitive equality.
pub fn equals(doc: &Value, column: &str, expected: &Value) -> bool {
    let wanted = nkey(&value_to_text(expected));
    folded_values(doc, column).iter().any(|v| *v == wanted)
}

/// Case- and accent-insensitive substring test.
pub fn contains(doc: &Value, column: &str, needle: &Value) -> bool {
    let wanted = nkey(&value_to_text(needle));
    folded_values(doc, column).iter().any(|v| v.contains(&wanted))
}

/// Numeric comparison after locale-aware parsing. Unparseable values never match.
pub fn compare(doc: &Value, column: &str, comparator: Comparator, operand: &Value) -> bool {
    let Some(right) = value_as_number(operand) else {
        return false;
    };
    find(doc, column)
        .iter()
        .filter_map(|m| m.get(doc))
        .filter_map(value_as_number)
        .any(|left| comparator.holds(left, right))
}

fn as_date(value: &Value) -> Option<chrono::NaiveDate> {
    value.as_str().and_then(|s| parse_date(s, None))
}

/// Inclusive range test: dates when the value and both bounds parse as dates,
/// numbers otherwise. Reversed bounds are swapped.
pub fn between(doc: &Value, column: &str, low: &Value, high: &Value) -> bool {
    let date_bounds = as_date(low).zip(as_date(high));
    let number_bounds = value_as_number(low).zip(value_as_number(high));

    find(doc, column)
        .iter()
        .filter_map(|m| m.get(doc))
        .any(|value| {
            if let (Some((lo, hi)), Some(date)) = (date_bounds, as_date(value)) {
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                return lo <= date && date <= hi;
            }
            match (number_bounds, value_as_number(value)) {
                (Some((lo, hi)), Some(n)) => {
                    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                    lo <= n && n <= hi
                }
                _ => false,
            }
        })
}
