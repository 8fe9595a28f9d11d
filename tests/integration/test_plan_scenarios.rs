use async_trait::async_trait;
use docplan::core::config::EngineConfig;
use docplan::core::currency::provider::RateSource;
use docplan::core::currency::CurrencyError;
use docplan::core::plan::{DiagnosticKind, Plan, PlanExecutor};
use docplan::core::Environment;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

struct StaticRates;

#[async_trait]
impl RateSource for StaticRates {
    async fn fetch(&self, base: &str, _date: &str) -> Result<Value, CurrencyError> {
        match base {
            "usd" => Ok(json!({"date": "2024-03-01", "usd": {"eur": 0.9, "ars": 850.0}})),
            other => Err(CurrencyError::Network(format!("no table for {}", other))),
        }
    }
}

fn executor_with(config: EngineConfig) -> PlanExecutor {
    let env = Environment::builder(config)
        .rate_source(Arc::new(StaticRates))
        .without_rate_cache()
        .build()
        .unwrap();
    PlanExecutor::new(Arc::new(env))
}

fn executor() -> PlanExecutor {
    let mut config = EngineConfig::default();
    config.semantic.enabled = false;
    executor_with(config)
}

fn plan(text: &str) -> Plan {
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn test_rename_then_format_date() {
    let summary = executor()
        .execute(
            vec![json!({"fecha_emision": "05/01/2024"})],
            &plan(
                r#"[{"op":"rename_columns","map":{"fecha_emision":"fecha"}},
                    {"op":"format_date","column":"fecha"}]"#,
            ),
        )
        .await;

    assert_eq!(summary.documents, vec![json!({"fecha": "2024-01-05"})]);
    assert!(summary.diagnostics.is_empty());
}

#[tokio::test]
async fn test_duplicate_op_key_reads_as_comparator() {
    let summary = executor()
        .execute(
            vec![json!({"monto": "150"}), json!({"monto": "50"})],
            &plan(r#"[{"op":"filter_compare","column":"monto","op":">","value":"100"}]"#),
        )
        .await;

    assert_eq!(summary.documents, vec![json!({"monto": "150"})]);
    assert_eq!(summary.dropped, vec![1]);
}

#[tokio::test]
async fn test_unknown_op_leaves_documents_unchanged() {
    let docs = vec![json!({"descripcion": "Tornillo"}), json!({"descripcion": "Tuerca"})];
    let summary = executor()
        .execute(docs.clone(), &plan(r#"[{"op":"summarize","columns":["descripcion"]}]"#))
        .await;

    assert_eq!(summary.documents, docs);
    assert_eq!(summary.diagnostics.len(), 2);
    assert!(summary
        .diagnostics
        .iter()
        .all(|d| d.kind == DiagnosticKind::UnknownOperation));
}

#[tokio::test]
async fn test_bogus_op_only_gets_the_numeric_post_pass() {
    let doc = json!({"monto": "1.5", "id": "1023", "nota": "sin cambios"});
    let summary = executor().execute(vec![doc.clone()], &plan(r#"[{"op":"bogus"}]"#)).await;

    assert_eq!(
        summary.documents,
        vec![json!({"monto": "1,50", "id": "1023", "nota": "sin cambios"})]
    );
    assert!(summary.dropped.is_empty());
    assert_eq!(summary.diagnostics.len(), 1);
    assert_eq!(summary.diagnostics[0].kind, DiagnosticKind::UnknownOperation);

    let mut config = EngineConfig::default();
    config.semantic.enabled = false;
    config.executor.numeric_format = false;
    let summary = executor_with(config)
        .execute(vec![doc.clone()], &plan(r#"[{"op":"bogus"}]"#))
        .await;
    assert_eq!(summary.documents, vec![doc]);
}

#[tokio::test]
async fn test_currency_conversion_with_post_pass() {
    let summary = executor()
        .execute(
            vec![json!({"monto": "100", "moneda": "USD"})],
            &plan(r#"[{"op":"currency_to","target":"EUR","columns":["monto"]}]"#),
        )
        .await;

    assert_eq!(
        summary.documents,
        vec![json!({"monto": "90,00", "moneda": "EUR", "monto_orig": "100"})]
    );
}

#[tokio::test]
async fn test_currency_failure_keeps_label() {
    let summary = executor()
        .execute(
            vec![json!({"monto": "100", "moneda": "BRL"})],
            &plan(r#"[{"op":"currency_to","target":"EUR","columns":["monto"]}]"#),
        )
        .await;

    assert_eq!(summary.documents, vec![json!({"monto": "100", "moneda": "BRL"})]);
    assert_eq!(summary.diagnostics[0].kind, DiagnosticKind::CurrencyUnavailable);
}

#[tokio::test]
async fn test_custom_unit_from_conversion_value() {
    let summary = executor()
        .execute(
            vec![json!({"peso": "25 kg"}), json!({"peso": "5 kg"})],
            &plan(
                r#"[{"op":"convert_units","columns":["peso"],"target_unit":"cajon",
                     "conversion_value":"10 kg"}]"#,
            ),
        )
        .await;

    assert_eq!(
        summary.documents,
        vec![json!({"peso": "2.5 cajon"}), json!({"peso": "0.5 cajon"})]
    );
    assert_eq!(summary.conversions.len(), 2);
    assert_eq!(summary.conversions[1].document, 1);
}

#[tokio::test]
async fn test_incompatible_dimension_is_reported_not_fatal() {
    let summary = executor()
        .execute(
            vec![json!({"peso": "3 kg", "largo": "2 m"})],
            &plan(r#"[{"op":"convert_units","to":"cm"}]"#),
        )
        .await;

    assert_eq!(summary.documents, vec![json!({"peso": "3 kg", "largo": "200 cm"})]);
    assert_eq!(summary.diagnostics.len(), 1);
    assert_eq!(summary.diagnostics[0].kind, DiagnosticKind::DimensionMismatch);
}

#[tokio::test]
async fn test_filter_then_export_csv() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = EngineConfig::default();
    config.semantic.enabled = false;
    config.executor.export_dir = dir.path().to_path_buf();

    let summary = executor_with(config)
        .execute(
            vec![
                json!({"cliente": "ACME", "monto": "10"}),
                json!({"cliente": "Globex", "monto": "20"}),
            ],
            &plan(
                r#"[{"op":"filter_equals","column":"cliente","value":"acme"},
                    {"op":"export","path":"output/resultado.xlsx"}]"#,
            ),
        )
        .await;

    let written = dir.path().join("output/resultado.csv");
    assert_eq!(summary.exports, vec![written.clone()]);
    let body = std::fs::read_to_string(Path::new(&written)).unwrap();
    assert_eq!(body.lines().collect::<Vec<_>>(), vec!["cliente,monto", "ACME,10"]);
}
