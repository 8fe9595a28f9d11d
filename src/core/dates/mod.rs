//! Best-effort date parsing and reformatting.
//!
//! Parsing never fails loudly: every entry point returns `None` when no strategy
//! applies, so one bad date leaves the field untouched and processing continues.

use crate::core::document::resolver::{navigate_mut, string_paths};
use crate::core::document::nkey;
use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt::Write;

pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

/// Numeric layouts tried in order when no input format is given.
pub const NUMERIC_FORMATS: [&str; 10] = [
    "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%y", "%d-%m-%y",
    "%y-%m-%d", "%m/%d/%Y", "%m-%d-%Y",
];

static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,4})([./\-])(\d{1,2})([./\-])(\d{2,4})").expect("valid regex")
});
static SPANISH_LONG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\s+de\s+([a-z]{3,15})\.?\s+(?:de(?:l)?\s+)?(\d{2,4})\b")
        .expect("valid regex")
});
static ENGLISH_LONG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([a-z]{3,15})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s*(\d{2,4})\b")
        .expect("valid regex")
});
static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})[\s\-]+([a-z]{3,15})\.?,?[\s\-]+(\d{2,4})\b").expect("valid regex")
});

const MONTHS: &[(&str, u32)] = &[
    ("enero", 1),
    ("ene", 1),
    ("january", 1),
    ("jan", 1),
    ("febrero", 2),
    ("feb", 2),
    ("february", 2),
    ("marzo", 3),
    ("mar", 3),
    ("march", 3),
    ("abril", 4),
    ("abr", 4),
    ("april", 4),
    ("apr", 4),
    ("mayo", 5),
    ("may", 5),
    ("junio", 6),
    ("jun", 6),
    ("june", 6),
    ("julio", 7),
    ("jul", 7),
    ("july", 7),
    ("agosto", 8),
    ("ago", 8),
    ("august", 8),
    ("aug", 8),
    ("septiembre", 9),
    ("setiembre", 9),
    ("sept", 9),
    ("sep", 9),
    ("set", 9),
    ("september", 9),
    ("octubre", 10),
    ("oct", 10),
    ("october", 10),
    ("noviembre", 11),
    ("nov", 11),
    ("november", 11),
    ("diciembre", 12),
    ("dic", 12),
    ("december", 12),
    ("dec", 12),
];

fn month_number(word: &str) -> Option<u32> {
    MONTHS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, number)| *number)
}

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    match raw.len() {
        2 => Some(2000 + year),
        4 => Some(year),
        _ => None,
    }
}

/// Parse with a strptime-style layout, rejecting `%Y` matches that are not four digits.
fn parse_with(raw: &str, layout: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(raw, layout).ok()?;
    if layout.contains("%Y") && !(1000..=9999).contains(&date.year()) {
        return None;
    }
    Some(date)
}

fn parse_numeric(raw: &str) -> Option<NaiveDate> {
    NUMERIC_FORMATS
        .iter()
        .find_map(|layout| parse_with(raw, layout))
}

fn parse_month_names(raw: &str) -> Option<NaiveDate> {
    let folded = nkey(raw);
    for pattern in [&*SPANISH_LONG, &*DAY_MONTH_YEAR] {
        if let Some(caps) = pattern.captures(&folded) {
            if let Some(month) = month_number(&caps[2]) {
                let day: u32 = caps[1].parse().ok()?;
                if let Some(date) = NaiveDate::from_ymd_opt(expand_year(&caps[3])?, month, day) {
                    return Some(date);
                }
            }
        }
    }
    let caps = ENGLISH_LONG.captures(&folded)?;
    let month = month_number(&caps[1])?;
    let day: u32 = caps[2].parse().ok()?;
    NaiveDate::from_ymd_opt(expand_year(&caps[3])?, month, day)
}

/// Parse a free-form date. `input_format` of `None`, `""` or `"infer"` means infer.
pub fn parse_date(raw: &str, input_format: Option<&str>) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(layout) = input_format.filter(|f| !f.is_empty() && *f != "infer") {
        if let Some(date) = parse_with(s, layout) {
            return Some(date);
        }
    }
    if let Some(date) = parse_numeric(s) {
        return Some(date);
    }
    if let Some(m) = NUMERIC_DATE.find(s) {
        if m.as_str() != s {
            if let Some(date) = parse_numeric(m.as_str()) {
                return Some(date);
            }
        }
    }
    parse_month_names(s)
}

/// Render `date` with a strftime layout; `None` if the layout is invalid for a date.
pub fn render(date: NaiveDate, layout: &str) -> Option<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(layout).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", date.format_with_items(items.iter())).ok()?;
    Some(out)
}

/// Reformat a date string, returning `None` when it cannot be parsed.
pub fn format_date(raw: &str, input_format: Option<&str>, output_format: &str) -> Option<String> {
    let layout = if output_format.trim().is_empty() {
        CANONICAL_FORMAT
    } else {
        output_format
    };
    render(parse_date(raw, input_format)?, layout)
}

/// Cheap gate used before attempting to reformat arbitrary strings.
pub fn looks_dateish(text: &str) -> bool {
    let t = text.trim();
    let len = t.chars().count();
    if !(6..=40).contains(&len) {
        return false;
    }
    if let Some(caps) = NUMERIC_DATE.captures(t) {
        if caps[2] == caps[4] {
            return true;
        }
    }
    nkey(t)
        .split(|c: char| !c.is_alphabetic())
        .any(|word| month_number(word).is_some())
}

/// Reformat every date-looking string in the document. Returns the number rewritten.
pub fn normalize_dates_everywhere(doc: &mut Value, output_format: &str) -> usize {
    let mut changed = 0;
    for path in string_paths(doc) {
        if let Some(Value::String(s)) = navigate_mut(doc, &path) {
            if !looks_dateish(s) {
                continue;
            }
            if let Some(formatted) = format_date(s, None, output_format) {
                if formatted != *s {
                    *s = formatted;
                    changed += 1;
                }
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_input_is_idempotent() {
        assert_eq!(
            format_date("2024-01-05", Some("infer"), "%Y-%m-%d").as_deref(),
            Some("2024-01-05")
        );
    }

    #[test]
    fn day_first_numeric_dates() {
        assert_eq!(
            format_date("05/01/2024", None, "%Y-%m-%d").as_deref(),
            Some("2024-01-05")
        );
        assert_eq!(
            format_date("5.1.2024", None, "%Y-%m-%d").as_deref(),
            Some("2024-01-05")
        );
    }

    #[test]
    fn two_digit_years_are_not_read_as_year_zero() {
        assert_eq!(
            format_date("05-01-24", None, "%Y-%m-%d").as_deref(),
            Some("2024-01-05")
        );
    }

    #[test]
    fn explicit_format_wins() {
        assert_eq!(
            format_date("01/05/2024", Some("%m/%d/%Y"), "%d/%m/%Y").as_deref(),
            Some("05/01/2024")
        );
    }

    #[test]
    fn embedded_date_is_extracted() {
        assert_eq!(
            format_date("Emitida el 05/01/2024 en CABA", None, "%Y-%m-%d").as_deref(),
            Some("2024-01-05")
        );
    }

    #[test]
    fn month_names_in_spanish_and_english() {
        assert_eq!(
            format_date("5 de enero de 2024", None, "%Y-%m-%d").as_deref(),
            Some("2024-01-05")
        );
        assert_eq!(
            format_date("January 5, 2024", None, "%Y-%m-%d").as_deref(),
            Some("2024-01-05")
        );
        assert_eq!(
            format_date("12 Sept 2023", None, "%d/%m/%Y").as_deref(),
            Some("12/09/2023")
        );
        assert_eq!(
            format_date("3 de Diciembre del 2022", None, "%Y-%m-%d").as_deref(),
            Some("2022-12-03")
        );
    }

    #[test]
    fn garbage_returns_none() {
        assert_eq!(format_date("mañana", None, "%Y-%m-%d"), None);
        assert_eq!(format_date("", None, "%Y-%m-%d"), None);
        assert_eq!(format_date("31/02/2024", None, "%Y-%m-%d"), None);
    }

    #[test]
    fn invalid_output_layout_is_none() {
        assert_eq!(format_date("2024-01-05", None, "%H:%M"), None);
    }

    #[test]
    fn everywhere_pass_only_touches_dates() {
        let mut doc = json!({"fecha": "05/01/2024", "nota": "pagar en marzo", "n": "12"});
        assert_eq!(normalize_dates_everywhere(&mut doc, CANONICAL_FORMAT), 1);
        assert_eq!(doc["fecha"], "2024-01-05");
        assert_eq!(doc["nota"], "pagar en marzo");
    }
}
