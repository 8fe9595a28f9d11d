use docplan::core::compiler::{InstructionCompiler, PlanSource};
use docplan::core::config::{EngineConfig, SemanticConfig};
use docplan::core::semantic::{OllamaSemanticService, SemanticError, SemanticService};
use docplan::core::Environment;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> SemanticConfig {
    SemanticConfig {
        host: format!("{}/", server.uri()),
        model: "test-model".to_string(),
        timeout_seconds: 5,
        ..Default::default()
    }
}

fn reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "model": "test-model",
        "message": {"role": "assistant", "content": content},
        "done": true
    }))
}

async fn mount_reply(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"model": "test-model", "stream": false})))
        .respond_with(reply(content))
        .mount(server)
        .await;
}

fn environment(service: OllamaSemanticService) -> Arc<Environment> {
    let env = Environment::builder(EngineConfig::default())
        .semantic(Arc::new(service))
        .without_rate_cache()
        .build()
        .unwrap();
    Arc::new(env)
}

#[tokio::test]
async fn test_compile_instruction_reads_fenced_json() {
    let server = MockServer::start().await;
    mount_reply(
        &server,
        "Here you go:\n```json\n{\"plan\": [{\"op\": \"export\", \"format\": \"csv\"}]}\n```",
    )
    .await;
    let service = OllamaSemanticService::new(config(&server)).unwrap();

    let value = service.compile_instruction("exportá a csv", None).await.unwrap();
    assert_eq!(value["plan"][0]["op"], "export");
}

#[tokio::test]
async fn test_semantic_plan_is_preferred() {
    let server = MockServer::start().await;
    mount_reply(
        &server,
        r#"{"plan": [{"op": "translate_values", "columns": ["detalle"], "target_lang": "alemán"}, {"op": "shout"}],
            "report": {"decisions": [{"op": "translate_values", "why": "asked", "confidence": 0.8}]}}"#,
    )
    .await;
    let env = environment(OllamaSemanticService::new(config(&server)).unwrap());

    let compiled = InstructionCompiler::new(env)
        .compile("traducí el detalle al alemán", Some(&json!({"detalle": "Tornillo"})))
        .await
        .unwrap();

    assert_eq!(compiled.source, PlanSource::Semantic);
    assert_eq!(compiled.plan.len(), 1);
    assert_eq!(compiled.plan.steps()[0].str_param("target_lang"), Some("DE"));
    assert_eq!(compiled.discarded_ops, vec!["shout"]);
    assert_eq!(compiled.decisions.len(), 1);
}

#[tokio::test]
async fn test_server_error_falls_back_to_rules() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let service = OllamaSemanticService::new(config(&server)).unwrap();
    assert_eq!(
        service.translate_text("hola", "EN").await.unwrap_err(),
        SemanticError::Status(500)
    );

    let compiled = InstructionCompiler::new(environment(service))
        .compile("exportá a csv", None)
        .await
        .unwrap();
    assert_eq!(compiled.source, PlanSource::Rules);
    assert_eq!(compiled.plan.steps()[0].op, "export");
}

#[tokio::test]
async fn test_translate_and_define_unit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"format": "json"})))
        .respond_with(reply(r#"{"factor": 2.54, "unit": "cm"}"#))
        .mount(&server)
        .await;
    mount_reply(&server, "  Screw  \n").await;
    let service = OllamaSemanticService::new(config(&server)).unwrap();

    assert_eq!(service.translate_text("Tornillo", "inglés").await.unwrap(), "Screw");
    let guess = service.define_unit("Zoll").await.unwrap().unwrap();
    assert_eq!(guess.factor, 2.54);
    assert_eq!(guess.base_unit, "cm");
}

#[tokio::test]
async fn test_classify_fields_maps_reply_keys() {
    let server = MockServer::start().await;
    mount_reply(
        &server,
        r#"{"columns": ["importe", ""], "currency_field": "moneda", "source": "ars"}"#,
    )
    .await;
    let service = OllamaSemanticService::new(config(&server)).unwrap();

    let classification = service
        .classify_fields(&json!({"importe": "1.000", "moneda": "ARS"}), "usd")
        .await
        .unwrap();
    assert_eq!(classification.amount_fields, vec!["importe"]);
    assert_eq!(classification.currency_field.as_deref(), Some("moneda"));
    assert_eq!(classification.source_currency.as_deref(), Some("ARS"));
}

#[tokio::test]
async fn test_non_json_reply_is_malformed() {
    let server = MockServer::start().await;
    mount_reply(&server, "I cannot help with that.").await;
    let service = OllamaSemanticService::new(config(&server)).unwrap();

    let err = service
        .convert_document(&json!({"largo": "2 m"}), &Value::from("cm"))
        .await
        .unwrap_err();
    assert!(matches!(err, SemanticError::MalformedReply(_)));
}
