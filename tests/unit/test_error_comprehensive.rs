use docplan::core::config::{ConfigLoader, ConfigValidator, EngineConfig};
use docplan::core::currency::CurrencyError;
use docplan::core::error::{AppError, ErrorCode};
use docplan::core::plan::{Diagnostic, DiagnosticKind};
use docplan::core::types::ErrorCategory;
use docplan::core::units::UnitError;
use docplan::utils::files::atomic_write;

const ALL_CODES: [ErrorCode; 10] = [
    ErrorCode::ConfigUnreadable,
    ErrorCode::ConfigMalformed,
    ErrorCode::ConfigInvalid,
    ErrorCode::SemanticClient,
    ErrorCode::RateClient,
    ErrorCode::NoPlan,
    ErrorCode::InvalidStep,
    ErrorCode::ExportDirectory,
    ErrorCode::ExportWrite,
    ErrorCode::ExportRename,
];

#[test]
fn test_codes_are_unique_and_prefixed_by_area() {
    let mut seen = std::collections::HashSet::new();
    for code in ALL_CODES {
        assert!(seen.insert(code.as_str()), "duplicate code {}", code);
        let prefix = match code.category() {
            ErrorCategory::ConfigError => "CFG-",
            ErrorCategory::ValidationError if code == ErrorCode::InvalidStep => "PLAN-",
            ErrorCategory::ValidationError => "CFG-",
            ErrorCategory::PlanError => "PLAN-",
            ErrorCategory::EnvironmentError => "ENV-",
            ErrorCategory::IoError => "IO-",
        };
        assert!(code.as_str().starts_with(prefix), "{} vs {}", code, prefix);
    }
}

#[test]
fn test_new_error_takes_category_from_code() {
    for code in ALL_CODES {
        let error = AppError::new(code, "test message");
        assert_eq!(error.category, code.category());
        assert_eq!(error.message, "test message");
        assert!(error.context.is_empty());
        assert!(error.source.is_none());
    }
}

#[test]
fn test_builders_and_display() {
    let error = AppError::new(ErrorCode::NoPlan, "no plan")
        .with_context("instruction", "hola")
        .with_suggestion("name the operation explicitly");

    assert_eq!(error.context.get("instruction").map(String::as_str), Some("hola"));
    assert_eq!(error.recovery_suggestions, vec!["name the operation explicitly"]);
    assert_eq!(
        error.to_string(),
        "[PLAN-COMPILE-001] PlanError: no plan (instruction=\"hola\")\nhint: name the operation explicitly"
    );
}

#[test]
fn test_caused_by_chains_cause() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing docplan.toml");
    let error = AppError::new(ErrorCode::ConfigUnreadable, "failed to read config file").caused_by(io);
    assert!(error.source.is_some());
    assert!(error.to_string().contains("\nCaused by: missing docplan.toml"));
}

#[test]
fn test_malformed_config_reports_path_and_hint() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("docplan.toml"), "[executor\nparallel_limit = 2").unwrap();

    let err = ConfigLoader::load_from_workspace(dir.path()).unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigMalformed);
    assert!(err.context["path"].ends_with("docplan.toml"));
    assert!(err.to_string().contains("hint: check docplan.toml"));
}

#[test]
fn test_invalid_config_value_is_a_validation_error() {
    let mut config = EngineConfig::default();
    config.executor.csv_delimiter = '\n';
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
    assert_eq!(err.category, ErrorCategory::ValidationError);
}

#[test]
fn test_export_into_a_file_path_fails_with_directory_code() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("output");
    std::fs::write(&blocker, "not a directory").unwrap();

    let err = atomic_write(&blocker.join("resultado.json"), b"[]").unwrap_err();
    assert_eq!(err.code, ErrorCode::ExportDirectory);
    assert_eq!(err.category, ErrorCategory::IoError);
    assert!(err.source.is_some());
}

#[test]
fn test_subsystem_errors_render_and_map_to_diagnostics() {
    let crossing = CurrencyError::NoCrossing {
        from: "EUR".into(),
        to: "JPY".into(),
        date: "latest".into(),
    };
    assert_eq!(crossing.to_string(), "no crossing available EUR->JPY for latest");

    let unknown = UnitError::UnknownUnit("zorblat".into());
    assert_eq!(DiagnosticKind::for_unit_error(&unknown), DiagnosticKind::UnknownUnit);
    assert_eq!(
        DiagnosticKind::for_unit_error(&UnitError::Conflict { name: "caja".into() }),
        DiagnosticKind::UnitConflict
    );

    let batch = Diagnostic::batch(DiagnosticKind::ExportFailure, 3, "export", "disk full");
    assert_eq!(batch.to_string(), "batch step 3 (export): ExportFailure: disk full");
    assert_eq!(batch.document, None);
}

#[test]
fn test_error_categories_serialize_by_name() {
    let json = serde_json::to_string(&ErrorCategory::EnvironmentError).unwrap();
    assert_eq!(json, "\"EnvironmentError\"");
    let back: ErrorCategory = serde_json::from_str("\"PlanError\"").unwrap();
    assert_eq!(back, ErrorCategory::PlanError);
}
