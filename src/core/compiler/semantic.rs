use super::Decision;
use crate::core::plan::{OpKind, Plan, Step};
use crate::core::semantic::normalize_lang;
use serde_json::Value;

/// Read a semantic compiler reply. Steps outside the vocabulary or not shaped like a
/// step are dropped; an unparseable reply is an empty plan.
pub fn plan_from_reply(reply: &Value) -> (Plan, Vec<Decision>, Vec<String>) {
    let raw_steps = match reply {
        Value::Object(map) => map.get("plan").and_then(Value::as_array),
        Value::Array(steps) => Some(steps),
        _ => None,
    };

    let mut steps = Vec::new();
    for raw in raw_steps.into_iter().flatten() {
        match Step::from_value(raw) {
            Ok(step) => steps.push(normalize_step(step)),
            Err(err) => tracing::debug!(error = %err, "ignoring malformed semantic step"),
        }
    }
    let (plan, discarded) = Plan::new(steps).known_only();

    let decisions = reply
        .pointer("/report/decisions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<Decision>(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    (plan, decisions, discarded)
}

fn normalize_step(mut step: Step) -> Step {
    if step.kind() == Some(OpKind::TranslateValues) {
        if let Some(lang) = step.str_param("target_lang").map(normalize_lang) {
            step.params.insert("target_lang".to_string(), Value::String(lang));
        }
    }
    step
}
