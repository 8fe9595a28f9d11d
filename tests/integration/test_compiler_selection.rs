use async_trait::async_trait;
use docplan::core::compiler::{InstructionCompiler, PlanSource, RuleCompiler};
use docplan::core::config::EngineConfig;
use docplan::core::semantic::{FieldClassification, SemanticError, SemanticService};
use docplan::core::types::ErrorCategory;
use docplan::core::{Environment, PlanExecutor};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Answers every plan request with a fixed reply and counts the calls.
struct FixedPlanner {
    reply: Value,
    calls: AtomicUsize,
}

impl FixedPlanner {
    fn new(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SemanticService for FixedPlanner {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn compile_instruction(
        &self,
        _instruction: &str,
        _context: Option<&Value>,
    ) -> Result<Value, SemanticError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    async fn convert_document(&self, _doc: &Value, _target: &Value) -> Result<Value, SemanticError> {
        Err(SemanticError::Unsupported("convert_document"))
    }

    async fn translate_text(&self, _text: &str, _lang: &str) -> Result<String, SemanticError> {
        Err(SemanticError::Unsupported("translate_text"))
    }

    async fn classify_fields(
        &self,
        _doc: &Value,
        _target_currency: &str,
    ) -> Result<FieldClassification, SemanticError> {
        Err(SemanticError::Unsupported("classify_fields"))
    }
}

fn environment(service: Option<Arc<dyn SemanticService>>) -> Arc<Environment> {
    let mut config = EngineConfig::default();
    config.semantic.enabled = service.is_some();
    let mut builder = Environment::builder(config).without_rate_cache();
    if let Some(service) = service {
        builder = builder.semantic(service);
    }
    Arc::new(builder.build().unwrap())
}

#[tokio::test]
async fn test_semantic_plan_wins_when_it_has_valid_steps() {
    let planner = FixedPlanner::new(json!({"plan": [{"op": "export", "format": "json"}]}));
    let service: Arc<dyn SemanticService> = planner.clone();
    let compiler = InstructionCompiler::new(environment(Some(service)));

    let compiled = compiler
        .compile("formatear la fecha a dd/mm/aaaa", None)
        .await
        .unwrap();

    assert_eq!(compiled.source, PlanSource::Semantic);
    assert_eq!(compiled.plan.steps()[0].op, "export");
    assert_eq!(planner.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_semantic_plan_falls_back_without_merging() {
    let planner: Arc<dyn SemanticService> = FixedPlanner::new(json!({"plan": [{"op": "dance"}]}));
    let compiler = InstructionCompiler::new(environment(Some(planner)));

    let compiled = compiler
        .compile("formatear la fecha a dd/mm/aaaa", None)
        .await
        .unwrap();

    assert_eq!(compiled.source, PlanSource::Rules);
    assert_eq!(compiled.plan.len(), 1);
    assert_eq!(compiled.plan.steps()[0].op, "format_date");
    assert!(compiled.discarded_ops.is_empty());
}

#[tokio::test]
async fn test_rules_only_never_calls_the_service() {
    let planner = FixedPlanner::new(json!({"plan": [{"op": "export"}]}));
    let service: Arc<dyn SemanticService> = planner.clone();
    let compiler = InstructionCompiler::new(environment(Some(service))).rules_only(true);

    let compiled = compiler
        .compile("Convertí largo y ancho a centímetros", None)
        .await
        .unwrap();

    assert_eq!(compiled.source, PlanSource::Rules);
    assert_eq!(compiled.plan.steps()[0].str_param("target_unit"), Some("cm"));
    assert_eq!(planner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unrecognized_instruction_is_a_plan_error() {
    let compiler = InstructionCompiler::new(environment(None));
    let err = compiler.compile("buenos días", None).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::PlanError);
    assert_eq!(err.code.as_str(), "PLAN-COMPILE-001");
    assert_eq!(err.context.get("instruction").map(String::as_str), Some("buenos días"));
}

#[test]
fn test_rule_plans_for_common_instructions() {
    let rules = RuleCompiler::new();
    let cases = [
        ("Renombrá 'Precio Unit' a 'precio'", vec!["rename_columns"]),
        ("poné la fecha en formato iso y exportá a csv", vec!["format_date", "export"]),
        ("traducir descripción al inglés", vec!["translate_values"]),
        ("filtrar donde proveedor contiene \"ferre\"", vec!["filter_contains"]),
        ("mostrar solo monto >= 1.000", vec!["filter_compare"]),
        ("convertir los importes a euros", vec!["currency_to"]),
        ("unificar medidas a pulgadas", vec!["convert_units"]),
    ];
    for (instruction, expected) in cases {
        let (plan, decisions) = rules.compile(instruction);
        let ops: Vec<&str> = plan.iter().map(|s| s.op.as_str()).collect();
        assert_eq!(ops, expected, "{}", instruction);
        assert!(!decisions.is_empty());
    }
}

#[tokio::test]
async fn test_compiled_rule_plan_applies_end_to_end() {
    let env = environment(None);
    let compiled = InstructionCompiler::new(env.clone())
        .compile("Convertí largo y ancho a mm", None)
        .await
        .unwrap();

    let summary = PlanExecutor::new(env)
        .execute(
            vec![json!({"largo": "1,5 m", "ancho": "20 cm", "alto": "3 m"})],
            &compiled.plan,
        )
        .await;

    assert_eq!(
        summary.documents,
        vec![json!({"largo": "1500 mm", "ancho": "200 mm", "alto": "3 m"})]
    );
    assert_eq!(summary.conversions.len(), 2);
}
