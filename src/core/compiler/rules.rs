//! Deterministic instruction compiler: intent keywords plus slot extraction, in
//! Spanish and English, with no external calls.

use super::Decision;
use crate::core::dates::parse_date;
use crate::core::document::nkey;
use crate::core::plan::{Plan, Step};
use crate::core::semantic::normalize_lang;
use crate::core::units::engine::parse_definitions;
use crate::core::units::{profile, Dimension, UnitRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

// Intents, matched on the folded instruction.
static RENAME: Lazy<Regex> = Lazy::new(|| re(r"\b(?:renombr|llam|etiquet)[a-z]*|\brename[a-z]*"));
static FORMAT: Lazy<Regex> =
    Lazy::new(|| re(r"\bformat[a-z]*|\bpone\s+la\s+fecha|\bponer\s+formato"));
static TRANSLATE: Lazy<Regex> = Lazy::new(|| re(r"\btraduc[a-z]*|\btranslat[a-z]*"));
static CONVERT: Lazy<Regex> =
    Lazy::new(|| re(r"\b(?:convert|pas|unific|normaliz)[aei][a-z]*|\bconvert[a-z]*"));
static FILTER: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(?:filtr|mostr)[aei][a-z]*|\bcontiene\b|\bfilter[a-z]*|\bcontains\b|\bonly\b|\bwhere\b|\bdonde\b")
});
static EXPORT: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(?:export|guard|descarg)[a-z]*|\bcsv\b|\bxlsx\b|\bexcel\b|\bsave\b|\bdownload[a-z]*")
});

// Nominal mentions.
static DATE_WORDS: Lazy<Regex> = Lazy::new(|| re(r"\b(fechas?|dates?)\b"));
static MEASURE_WORDS: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(largo|ancho|alto|peso|longitud|anchura|altura|length|width|height|weight|medidas|dimensiones|dimensions)\b")
});
static DESC_WORDS: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(descripcion(?:es)?|detalles?|conceptos?|items?|descriptions?)\b")
});
static MONEY_WORDS: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(montos?|importes?|total(?:es)?|precios?|costos?|costes?|amounts?|prices?)\b")
});
static EXPORT_WORDS: Lazy<Regex> = Lazy::new(|| re(r"\b(salida|xlsx|excel|csv|json)\b"));

// Entities.
static QUOTED: Lazy<Regex> = Lazy::new(|| re(r#"["“”'‘’]([^"“”'‘’]+)["“”'‘’]"#));
static COLUMN_LIST: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\bcolumnas?\s+(\w+(?:\s*(?:,|\by\b|\band\b)\s*\w+)*)"));
static LIST_SPLIT: Lazy<Regex> = Lazy::new(|| re(r"(?i)\s*(?:,|\by\b|\band\b)\s*"));
static LANG_NAME: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(ingles|english|espanol|castellano|spanish|aleman|german|italiano|italian|portugues|portuguese|frances|french)\b")
});
static LANG_CODE: Lazy<Regex> = Lazy::new(|| re(r"\b(?:a|al|to|into|en)\s+(EN|ES|DE|IT|PT|FR)\b"));
static DESTINATION: Lazy<Regex> =
    Lazy::new(|| re(r"\b(?:a|al|en|to|into|in)\s+(?:los\s+|las\s+|el\s+|la\s+)?([a-z0-9/^]+)"));
static CURRENCY_DEST: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(?:a|al|en|to|into|in)\s+(?:los\s+|las\s+)?(dolares|dolar|dollars?|usd|euros?|eur|pesos\s+mexicanos|pesos(?:\s+argentinos)?|ars|reales|brl|gbp|libras\s+esterlinas|mxn|clp|jpy|yenes|yen|chf|cad|uyu)\b")
});
static ISO_WORD: Lazy<Regex> = Lazy::new(|| re(r"\biso\b"));
static JSON_WORD: Lazy<Regex> = Lazy::new(|| re(r"\bjson\b"));
static CURRENCY_MENTION: Lazy<Regex> = Lazy::new(|| re(r"\b(usd|dolar|dolares|dollars?)\b"));

// Filters, matched on the raw instruction.
static FILTER_EQ: Lazy<Regex> = Lazy::new(|| {
    re(r#"(?i)(\w+)\s*(?:==|=|\bes\s+igual\s+a\b|\bigual\s+a\b|\bequals\b)\s*["“”'‘’]([^"“”'‘’]+)["“”'‘’]"#)
});
static FILTER_EQ_BARE: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\b(?:donde|dónde|where)\s+(\w+)\s*==?\s*([\w.\-]+)"));
static FILTER_CONTAINS: Lazy<Regex> = Lazy::new(|| {
    re(r#"(?i)(\w+)\s+(?:contiene|contains|incluye|includes)\s+(?:["“”'‘’]([^"“”'‘’]+)["“”'‘’]|(\w+))"#)
});
static FILTER_CMP: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)(\w+)\s*(<=|>=|!=|<|>)\s*(-?[0-9][0-9.,]*)"));
static FILTER_CMP_WORDS: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)(\w+)\s+(?:es\s+|is\s+)?(mayor\s+o\s+igual\s+(?:a|que)|menor\s+o\s+igual\s+(?:a|que)|mayor\s+(?:a|que)|menor\s+(?:a|que)|greater\s+than\s+or\s+equal\s+to|less\s+than\s+or\s+equal\s+to|greater\s+than|less\s+than|above|below)\s+(-?[0-9][0-9.,]*)")
});
static FILTER_BETWEEN: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)(?:(\w+)\s+)?(?:entre|between)\s+([0-9][0-9/.\-,]*)\s+(?:y|and)\s+([0-9][0-9/.\-,]*)")
});
static RENAME_BARE: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(?:renombr\w*|rename|llam\w*)\s+(?:la\s+columna\s+|el\s+campo\s+|the\s+column\s+|column\s+)?(\w+)\s+(?:a|como|por|to|as)\s+(\w+)")
});

static UNITS: Lazy<UnitRegistry> = Lazy::new(UnitRegistry::new);

/// Short unit symbols trusted after a destination preposition.
const SHORT_UNITS: [&str; 15] = [
    "mm", "cm", "m", "km", "in", "ft", "yd", "mi", "mg", "g", "kg", "lb", "oz", "l", "ml",
];

const FILTER_STOPWORDS: [&str; 8] = ["donde", "dónde", "where", "que", "sea", "is", "are", "valores"];

#[derive(Debug, Clone, PartialEq)]
enum FilterSlot {
    Equals { column: String, value: String },
    Contains { column: String, value: String },
    Compare { column: String, cmp: String, value: String },
    Between { column: String, low: String, high: String },
}

#[derive(Debug, Default)]
struct Intents {
    rename: bool,
    format: bool,
    translate: bool,
    convert: bool,
    filter: bool,
    export: bool,
}

#[derive(Debug, Default)]
struct Slots {
    columns: Vec<String>,
    target_lang: Option<String>,
    unit_dest: Option<String>,
    custom_unit: bool,
    date_fmt: Option<&'static str>,
    export_fmt: Option<&'static str>,
    currency: Option<&'static str>,
    filter: Option<FilterSlot>,
    date_word: Option<String>,
    measure_words: Vec<String>,
    money_words: Vec<String>,
    mention_desc: bool,
    mention_export: bool,
}

/// Builds plans from keyword intents and extracted slots.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleCompiler;

impl RuleCompiler {
    pub fn new() -> Self {
        Self
    }

    pub fn compile(&self, instruction: &str) -> (Plan, Vec<Decision>) {
        let folded = nkey(instruction);
        let intents = detect_intents(&folded);
        let slots = extract_slots(instruction, &folded);
        tracing::debug!(?intents, ?slots, "rule compiler slots");
        build_plan(&intents, &slots, instruction)
    }
}

fn detect_intents(folded: &str) -> Intents {
    Intents {
        rename: RENAME.is_match(folded),
        format: FORMAT.is_match(folded),
        translate: TRANSLATE.is_match(folded),
        convert: CONVERT.is_match(folded),
        filter: FILTER.is_match(folded),
        export: EXPORT.is_match(folded),
    }
}

/// Strip a plural `s` so mentions map onto field names (`montos` -> `monto`).
fn singular(word: &str) -> String {
    match word.strip_suffix("es") {
        Some(stem) if stem.ends_with(['l', 'n', 'r']) => stem.to_string(),
        _ => word.strip_suffix('s').unwrap_or(word).to_string(),
    }
}

fn mentions(pattern: &Regex, folded: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in pattern.captures_iter(folded) {
        let word = singular(&caps[1]);
        if !out.contains(&word) {
            out.push(word);
        }
    }
    out
}

fn canonical_unit(word: &str) -> Option<String> {
    if word.len() > 3 && profile(word).is_some() {
        return Some(word.to_string());
    }
    if word.chars().count() <= 2 && !SHORT_UNITS.contains(&word) {
        return None;
    }
    let unit = UNITS.lookup(word)?;
    (unit.dimension != Dimension::Dimensionless).then_some(unit.symbol)
}

fn currency_code(word: &str) -> Option<&'static str> {
    let code = match word.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
        "dolares" | "dolar" | "dollar" | "dollars" | "usd" => "USD",
        "euro" | "euros" | "eur" => "EUR",
        "pesos mexicanos" | "mxn" => "MXN",
        "pesos" | "pesos argentinos" | "ars" => "ARS",
        "reales" | "brl" => "BRL",
        "gbp" | "libras esterlinas" => "GBP",
        "clp" => "CLP",
        "jpy" | "yen" | "yenes" => "JPY",
        "chf" => "CHF",
        "cad" => "CAD",
        "uyu" => "UYU",
        _ => return None,
    };
    Some(code)
}

fn extract_filter(raw: &str) -> Option<FilterSlot> {
    if let Some(caps) = FILTER_EQ.captures(raw).or_else(|| FILTER_EQ_BARE.captures(raw)) {
        return Some(FilterSlot::Equals {
            column: caps[1].to_string(),
            value: caps[2].trim().to_string(),
        });
    }
    if let Some(caps) = FILTER_CONTAINS.captures(raw) {
        let value = caps.get(2).or_else(|| caps.get(3))?.as_str().trim().to_string();
        return Some(FilterSlot::Contains {
            column: caps[1].to_string(),
            value,
        });
    }
    if let Some(caps) = FILTER_CMP.captures(raw) {
        return Some(FilterSlot::Compare {
            column: caps[1].to_string(),
            cmp: caps[2].to_string(),
            value: caps[3].trim_end_matches(['.', ',']).to_string(),
        });
    }
    if let Some(caps) = FILTER_CMP_WORDS.captures(raw) {
        let phrase = nkey(&caps[2]);
        let cmp = if phrase.contains("igual") || phrase.contains("equal") {
            if phrase.starts_with("mayor") || phrase.starts_with("greater") {
                ">="
            } else {
                "<="
            }
        } else if phrase.starts_with("mayor") || phrase.starts_with("greater") || phrase == "above" {
            ">"
        } else {
            "<"
        };
        return Some(FilterSlot::Compare {
            column: caps[1].to_string(),
            cmp: cmp.to_string(),
            value: caps[3].trim_end_matches(['.', ',']).to_string(),
        });
    }
    if let Some(caps) = FILTER_BETWEEN.captures(raw) {
        let low = caps[2].trim_end_matches(['.', ',']).to_string();
        let high = caps[3].trim_end_matches(['.', ',']).to_string();
        let named = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|word| {
                let folded = nkey(word);
                !FILTER_STOPWORDS.contains(&folded.as_str()) && !FILTER.is_match(&folded)
            });
        let column = match named {
            Some(word) => word.to_string(),
            None if parse_date(&low, None).is_some() && parse_date(&high, None).is_some() => {
                "fecha".to_string()
            }
            None => "monto".to_string(),
        };
        return Some(FilterSlot::Between { column, low, high });
    }
    None
}

fn extract_columns(raw: &str, filter: Option<&FilterSlot>) -> Vec<String> {
    let filter_value = match filter {
        Some(FilterSlot::Equals { value, .. }) | Some(FilterSlot::Contains { value, .. }) => {
            Some(nkey(value))
        }
        _ => None,
    };
    let mut candidates: Vec<String> = QUOTED
        .captures_iter(raw)
        .map(|caps| caps[1].trim().to_string())
        .filter(|c| Some(nkey(c)) != filter_value)
        .collect();
    if let Some(caps) = COLUMN_LIST.captures(raw) {
        candidates.extend(
            LIST_SPLIT
                .split(&caps[1])
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        );
    }

    let mut seen = Vec::new();
    let mut out = Vec::new();
    for column in candidates {
        let key = nkey(&column);
        if !key.is_empty() && !seen.contains(&key) {
            seen.push(key);
            out.push(column);
        }
    }
    out
}

fn extract_slots(raw: &str, folded: &str) -> Slots {
    let filter = extract_filter(raw);
    let columns = extract_columns(raw, filter.as_ref());

    let target_lang = LANG_NAME
        .captures(folded)
        .map(|caps| normalize_lang(&caps[1]))
        .or_else(|| LANG_CODE.captures(raw).map(|caps| caps[1].to_string()));

    let definitions = parse_definitions(raw);
    let mut unit_dest = None;
    let mut custom_unit = false;
    for caps in DESTINATION.captures_iter(folded) {
        let word = &caps[1];
        if let Some(unit) = canonical_unit(word) {
            unit_dest = Some(unit);
            break;
        }
        let stem = singular(word);
        if let Some(def) = definitions.iter().find(|d| d.name == word || d.name == stem) {
            unit_dest = Some(def.name.clone());
            custom_unit = true;
            break;
        }
    }

    let date_fmt = if folded.contains("dd/mm/aaaa") || folded.contains("dd/mm/yyyy") {
        Some("%d/%m/%Y")
    } else if folded.contains("mm/dd/aaaa") || folded.contains("mm/dd/yyyy") {
        Some("%m/%d/%Y")
    } else if folded.contains("dd-mm-aaaa") || folded.contains("dd-mm-yyyy") {
        Some("%d-%m-%Y")
    } else if folded.contains("dd.mm.aaaa") || folded.contains("dd.mm.yyyy") {
        Some("%d.%m.%Y")
    } else if folded.contains("aaaa-mm-dd")
        || folded.contains("yyyy-mm-dd")
        || ISO_WORD.is_match(folded)
    {
        Some("%Y-%m-%d")
    } else {
        None
    };

    let export_fmt = if folded.contains("xlsx") || folded.contains("excel") {
        Some("xlsx")
    } else if folded.contains("csv") {
        Some("csv")
    } else if folded.contains("jsonl") {
        Some("jsonl")
    } else if JSON_WORD.is_match(folded) {
        Some("json")
    } else {
        None
    };

    let currency = CURRENCY_DEST
        .captures(folded)
        .and_then(|caps| currency_code(&caps[1]))
        .or_else(|| CURRENCY_MENTION.captures(folded).and_then(|caps| currency_code(&caps[1])));

    Slots {
        columns,
        target_lang,
        unit_dest,
        custom_unit,
        date_fmt,
        export_fmt,
        currency,
        filter,
        date_word: mentions(&DATE_WORDS, folded).into_iter().next(),
        measure_words: mentions(&MEASURE_WORDS, folded),
        money_words: mentions(&MONEY_WORDS, folded),
        mention_desc: DESC_WORDS.is_match(folded),
        mention_export: EXPORT_WORDS.is_match(folded),
    }
}

fn is_date_column(column: &str) -> bool {
    matches!(nkey(column).as_str(), "fecha" | "fechas" | "fec" | "date" | "dates")
}

fn step(op: &str, params: Value) -> Step {
    let mut step = Step::new(op);
    if let Value::Object(map) = params {
        step.params = map;
    }
    step
}

fn build_plan(intents: &Intents, slots: &Slots, raw: &str) -> (Plan, Vec<Decision>) {
    let mut steps = Vec::new();
    let mut decisions = Vec::new();
    let cols = &slots.columns;

    if intents.rename {
        let mut mapping = Map::new();
        if cols.len() >= 2 {
            for pair in cols.chunks_exact(2) {
                mapping.insert(pair[0].clone(), json!(pair[1]));
            }
        } else if let Some(caps) = RENAME_BARE.captures(raw) {
            mapping.insert(caps[1].to_string(), json!(caps[2].to_string()));
        }
        if mapping.is_empty() {
            decisions.push(Decision::new("rename_columns", "rename intent without column pairs; skipped", 0.3));
        } else {
            steps.push(step("rename_columns", json!({ "map": mapping })));
            decisions.push(Decision::new("rename_columns", "rename intent with column pairs", 0.85));
        }
    }

    if slots.date_fmt.is_some() || (intents.format && slots.date_word.is_some()) {
        let column = cols
            .iter()
            .find(|c| is_date_column(c))
            .cloned()
            .or_else(|| slots.date_word.clone())
            .unwrap_or_else(|| "fecha".to_string());
        steps.push(step(
            "format_date",
            json!({
                "column": column,
                "input_fmt": "infer",
                "output_fmt": slots.date_fmt.unwrap_or("%Y-%m-%d"),
            }),
        ));
        let confidence = if slots.date_fmt.is_some() { 0.8 } else { 0.65 };
        decisions.push(Decision::new("format_date", "format intent or explicit date layout", confidence));
    }

    if intents.translate || (slots.target_lang.is_some() && slots.mention_desc) {
        let lang = slots.target_lang.clone().unwrap_or_else(|| "EN".to_string());
        let mut columns: Vec<String> = cols.iter().filter(|c| !is_date_column(c)).cloned().collect();
        if columns.is_empty() {
            columns.push("descripcion".to_string());
        }
        steps.push(step(
            "translate_values",
            json!({ "columns": columns, "target_lang": lang }),
        ));
        let confidence = if slots.target_lang.is_some() { 0.75 } else { 0.7 };
        decisions.push(Decision::new("translate_values", "translate intent or language mention", confidence));
    }

    if intents.convert || (slots.unit_dest.is_some() && !slots.measure_words.is_empty()) {
        match &slots.unit_dest {
            Some(unit) => {
                let mut columns: Vec<String> = slots
                    .measure_words
                    .iter()
                    .filter(|w| !matches!(w.as_str(), "medida" | "dimensione" | "dimension"))
                    .cloned()
                    .collect();
                if columns.is_empty() {
                    columns = cols.iter().filter(|c| !is_date_column(c)).cloned().collect();
                }
                if columns.is_empty() {
                    columns = vec!["largo".into(), "ancho".into(), "alto".into()];
                }
                let mut params = json!({ "columns": columns, "target_unit": unit });
                if slots.custom_unit {
                    params["instruction"] = json!(raw);
                }
                steps.push(step("convert_units", params));
                decisions.push(Decision::new("convert_units", "convert intent with an unambiguous target unit", 0.8));
            }
            None if slots.currency.is_none() => {
                decisions.push(Decision::new("convert_units", "convert intent without a target unit; skipped", 0.3));
            }
            None => {}
        }
    }

    if let Some(filter) = &slots.filter {
        let filter_step = match filter {
            FilterSlot::Equals { column, value } => {
                step("filter_equals", json!({ "column": column, "value": value }))
            }
            FilterSlot::Contains { column, value } => {
                step("filter_contains", json!({ "column": column, "value": value }))
            }
            FilterSlot::Compare { column, cmp, value } => step(
                "filter_compare",
                json!({ "column": column, "cmp": cmp, "value": value }),
            ),
            FilterSlot::Between { column, low, high } => step(
                "filter_between",
                json!({ "column": column, "range": [low, high] }),
            ),
        };
        steps.push(filter_step);
        decisions.push(Decision::new("filter", "recognized filter clause", 0.9));
    } else if intents.filter {
        decisions.push(Decision::new("filter", "filter intent without a recognizable clause; skipped", 0.4));
    }

    if let Some(code) = slots.currency {
        let mut params = json!({ "target": code });
        let money: Vec<&String> = cols
            .iter()
            .filter(|c| MONEY_WORDS.is_match(&nkey(c)))
            .collect();
        if !money.is_empty() {
            params["columns"] = json!(money);
        } else if !slots.money_words.is_empty() {
            params["columns"] = json!(slots.money_words);
        }
        steps.push(step("currency_to", params));
        decisions.push(Decision::new("currency_to", "currency mentioned as a target", 0.6));
    }

    if intents.export || (slots.export_fmt.is_some() && slots.mention_export) {
        let format = slots.export_fmt.unwrap_or("csv");
        steps.push(step(
            "export",
            json!({ "format": format, "path": format!("output/resultado.{}", format) }),
        ));
        let confidence = if slots.export_fmt.is_some() { 0.95 } else { 0.7 };
        decisions.push(Decision::new("export", "export intent or output format", confidence));
    }

    (Plan::new(steps), decisions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(plan: &Plan) -> Vec<&str> {
        plan.iter().map(|s| s.op.as_str()).collect()
    }

    #[test]
    fn rename_and_date_format() {
        let (plan, _) = RuleCompiler::new()
            .compile("Renombrá 'Descripción' a 'detalle' y formateá la fecha a dd/mm/aaaa");
        assert_eq!(ops(&plan), vec!["rename_columns", "format_date"]);
        assert_eq!(plan.steps()[0].params["map"], json!({"Descripción": "detalle"}));
        assert_eq!(plan.steps()[1].str_param("output_fmt"), Some("%d/%m/%Y"));
        assert_eq!(plan.steps()[1].str_param("column"), Some("fecha"));
    }

    #[test]
    fn convert_with_spanish_unit_name() {
        let (plan, _) = RuleCompiler::new().compile("Convertí largo y ancho a milímetros");
        assert_eq!(ops(&plan), vec!["convert_units"]);
        assert_eq!(plan.steps()[0].str_param("target_unit"), Some("mm"));
        assert_eq!(plan.steps()[0].columns(), vec!["largo", "ancho"]);
    }

    #[test]
    fn convert_defaults_to_dimension_columns() {
        let (plan, _) = RuleCompiler::new().compile("convert everything to lb");
        assert_eq!(plan.steps()[0].str_param("target_unit"), Some("lb"));
        assert_eq!(plan.steps()[0].columns(), vec!["largo", "ancho", "alto"]);
    }

    #[test]
    fn custom_unit_destination_carries_the_instruction() {
        let text = "pasá el peso a cajones, 1 cajon = 10 kg";
        let (plan, _) = RuleCompiler::new().compile(text);
        let step = &plan.steps()[0];
        assert_eq!(step.op, "convert_units");
        assert_eq!(step.str_param("target_unit"), Some("cajon"));
        assert_eq!(step.str_param("instruction"), Some(text));
    }

    #[test]
    fn translate_defaults_to_description() {
        let (plan, _) = RuleCompiler::new().compile("Traducí la descripción al inglés");
        assert_eq!(ops(&plan), vec!["translate_values"]);
        assert_eq!(plan.steps()[0].columns(), vec!["descripcion"]);
        assert_eq!(plan.steps()[0].str_param("target_lang"), Some("EN"));
    }

    #[test]
    fn equality_filter_and_excel_export() {
        let (plan, _) = RuleCompiler::new()
            .compile("Filtrá donde cliente = \"ACME\" y exportá a Excel");
        assert_eq!(ops(&plan), vec!["filter_equals", "export"]);
        assert_eq!(plan.steps()[0].str_param("column"), Some("cliente"));
        assert_eq!(plan.steps()[0].str_param("value"), Some("ACME"));
        assert_eq!(plan.steps()[1].str_param("path"), Some("output/resultado.xlsx"));
    }

    #[test]
    fn comparison_filters() {
        let (plan, _) = RuleCompiler::new().compile("mostrá solo donde monto > 100");
        assert_eq!(plan.steps()[0].op, "filter_compare");
        assert_eq!(plan.steps()[0].comparator(), Some(">"));
        assert_eq!(plan.steps()[0].str_param("value"), Some("100"));

        let (plan, _) = RuleCompiler::new().compile("show rows where total is less than 50");
        assert_eq!(plan.steps()[0].str_param("column"), Some("total"));
        assert_eq!(plan.steps()[0].comparator(), Some("<"));
    }

    #[test]
    fn between_defaults_column_from_bounds() {
        let (plan, _) = RuleCompiler::new().compile("filtrar entre 2024-01-01 y 2024-01-31");
        assert_eq!(plan.steps()[0].op, "filter_between");
        assert_eq!(plan.steps()[0].str_param("column"), Some("fecha"));
        assert_eq!(plan.steps()[0].params["range"], json!(["2024-01-01", "2024-01-31"]));
    }

    #[test]
    fn currency_target_is_detected() {
        let (plan, _) = RuleCompiler::new().compile("pasá los montos a dólares");
        assert_eq!(ops(&plan), vec!["currency_to"]);
        assert_eq!(plan.steps()[0].str_param("target"), Some("USD"));
        assert_eq!(plan.steps()[0].columns(), vec!["monto"]);

        let (plan, _) = RuleCompiler::new().compile("convert the price to EUR");
        assert_eq!(plan.steps()[0].str_param("target"), Some("EUR"));
    }

    #[test]
    fn nothing_recognized_is_empty() {
        let (plan, decisions) = RuleCompiler::new().compile("hola, ¿cómo estás?");
        assert!(plan.is_empty());
        assert!(decisions.is_empty());
    }
}
