//! Locale-aware number parsing and formatting.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d,.\-]").expect("valid regex"));
static HAS_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]").expect("valid regex"));
static INNER_HYPHEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w-\w").expect("valid regex"));

/// Parse a human-written number, disambiguating `,` and `.` by position.
///
/// When both separators appear, the last one is the decimal separator. A lone comma
/// is a decimal comma; repeated identical separators are thousands grouping.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned = NON_NUMERIC.replace_all(trimmed, "").to_string();
    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();

    let canonical = match (commas, dots) {
        (0, 0) => cleaned,
        (c, d) if c > 0 && d > 0 => {
            let last_comma = cleaned.rfind(',').unwrap_or(0);
            let last_dot = cleaned.rfind('.').unwrap_or(0);
            if last_comma > last_dot {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (1, 0) => cleaned.replace(',', "."),
        (_, 0) => cleaned.replace(',', ""),
        (0, 1) => cleaned,
        _ => cleaned.replace('.', ""),
    };

    let value = canonical.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Numeric reading of a JSON value: numbers directly, strings through [`parse_number`].
pub fn value_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Plain-text rendering of a scalar, as used by string predicates.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Render a magnitude with at most `precision` decimals and no trailing zeros.
pub fn format_magnitude(value: f64, precision: usize) -> String {
    let rendered = format!("{:.*}", precision, value);
    let trimmed = if rendered.contains('.') {
        rendered.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        rendered
    };
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed
    }
}

/// Fixed-decimal rendering with a configurable decimal separator.
pub fn format_decimal(value: f64, places: usize, separator: &str) -> String {
    let rendered = format!("{:.*}", places, value);
    if separator == "." {
        rendered
    } else {
        rendered.replace('.', separator)
    }
}

/// JSON number for a finite float, preferring an integer representation when exact.
pub fn number_value(value: f64) -> Option<Value> {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return Some(Value::from(value as i64));
    }
    serde_json::Number::from_f64(value).map(Value::Number)
}

/// True for strings that are only a number, such as `"1.234,50"` or `"(12)"`.
///
/// Strings with letters, `/`, `:`, `#` or an inner hyphen (dates, codes) are excluded.
pub fn is_pure_numeric_like(raw: &str) -> bool {
    let t = raw.trim();
    if t.is_empty() || HAS_LETTER.is_match(t) {
        return false;
    }
    if t.contains(['/', ':', '#']) || INNER_HYPHEN.is_match(t) {
        return false;
    }
    let mut u: String = t.replace(' ', "");
    u = u.trim_matches(|c| c == '(' || c == ')').to_string();
    if let Some(rest) = u.strip_prefix(['+', '-']) {
        u = rest.to_string();
    }
    let u = u.replace(['.', ','], "");
    let u = u.strip_suffix('%').unwrap_or(&u);
    !u.is_empty() && u.chars().all(|c| c.is_ascii_digit())
}
