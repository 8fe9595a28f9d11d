use docplan::core::config::{ConfigLoader, ConfigValidator};
use docplan::core::types::ErrorCategory;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_docplan_env() {
    for v in &[
        "OLLAMA_HOST",
        "OLLAMA_MODEL",
        "DOCPLAN_SEMANTIC_ENABLED",
        "DOCPLAN_SEMANTIC_HOST",
        "DOCPLAN_SEMANTIC_MODEL",
        "DOCPLAN_SEMANTIC_TIMEOUT",
        "DOCPLAN_CURRENCY_CACHE_DIR",
        "DOCPLAN_CURRENCY_TTL",
        "DOCPLAN_CURRENCY_PRIMARY_URL",
        "DOCPLAN_CURRENCY_MIRROR_URL",
        "DOCPLAN_UNITS_PRECISION",
        "DOCPLAN_EXECUTOR_PARALLEL_LIMIT",
        "DOCPLAN_EXECUTOR_TEXT_CLEANUP",
        "DOCPLAN_EXECUTOR_DECIMAL_SEPARATOR",
        "DOCPLAN_EXECUTOR_CSV_DELIMITER",
        "DOCPLAN_EXECUTOR_EXPORT_DIR",
    ] {
        env::remove_var(v);
    }
}

#[test]
#[serial]
fn test_missing_file_yields_defaults_anchored_to_workspace() {
    clear_docplan_env();
    let temp_dir = TempDir::new().unwrap();

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();

    assert!(config.semantic.enabled);
    assert_eq!(config.semantic.model, "qwen2.5:latest");
    assert_eq!(
        config.currency.cache_dir,
        temp_dir.path().join(".docplan/cache/rates")
    );
    assert_eq!(config.executor.export_dir, temp_dir.path().join("."));
    assert!(ConfigValidator::validate(&config).is_ok());
}

#[test]
#[serial]
fn test_config_loading_integration() {
    clear_docplan_env();
    let temp_dir = TempDir::new().unwrap();
    let workspace_path = temp_dir.path();

    let config_content = r#"
[semantic]
enabled = true
host = "http://gpu-box:11434"
model = "llama3.1"

[currency]
cache_dir = "/var/cache/docplan"
ttl = "2h"
pivots = ["usd"]

[units]
precision = 4

[executor]
parallel_limit = 2
decimal_separator = "."
export_dir = "salidas"
"#;
    fs::write(workspace_path.join("docplan.toml"), config_content).unwrap();

    let config = ConfigLoader::load_from_workspace(workspace_path).unwrap();

    assert_eq!(config.semantic.host, "http://gpu-box:11434");
    assert_eq!(config.semantic.model, "llama3.1");
    assert_eq!(config.currency.cache_dir, PathBuf::from("/var/cache/docplan"));
    assert_eq!(config.currency.ttl_duration().as_secs(), 7200);
    assert_eq!(config.currency.pivots, vec!["usd"]);
    assert_eq!(config.units.precision, 4);
    assert_eq!(config.executor.parallel_limit, 2);
    assert_eq!(config.executor.decimal_separator, ".");
    assert_eq!(config.executor.export_dir, workspace_path.join("salidas"));
    assert!(ConfigValidator::validate(&config).is_ok());
}

#[test]
#[serial]
fn test_env_overrides_file_and_docplan_wins_over_ollama() {
    clear_docplan_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("docplan.toml"),
        "[semantic]\nmodel = \"from-file\"\n\n[executor]\nparallel_limit = 2\n",
    )
    .unwrap();

    env::set_var("OLLAMA_HOST", "http://ollama-env:11434");
    env::set_var("OLLAMA_MODEL", "ollama-model");
    env::set_var("DOCPLAN_SEMANTIC_MODEL", "docplan-model");
    env::set_var("DOCPLAN_EXECUTOR_PARALLEL_LIMIT", "9");
    env::set_var("DOCPLAN_SEMANTIC_ENABLED", "false");

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    clear_docplan_env();

    assert_eq!(config.semantic.host, "http://ollama-env:11434");
    assert_eq!(config.semantic.model, "docplan-model");
    assert!(!config.semantic.enabled);
    assert_eq!(config.executor.parallel_limit, 9);
}

#[test]
#[serial]
fn test_unparseable_env_values_are_ignored() {
    clear_docplan_env();
    let temp_dir = TempDir::new().unwrap();
    env::set_var("DOCPLAN_EXECUTOR_PARALLEL_LIMIT", "many");

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    clear_docplan_env();

    assert_eq!(config.executor.parallel_limit, 4);
}

#[test]
#[serial]
fn test_malformed_file_is_a_config_error() {
    clear_docplan_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("docplan.toml"), "[executor\nparallel_limit = 2").unwrap();

    let err = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap_err();

    assert_eq!(err.category, ErrorCategory::ConfigError);
    assert_eq!(err.code.as_str(), "CFG-PARSE-001");
}

#[test]
#[serial]
fn test_validator_rejects_bad_separator() {
    clear_docplan_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("docplan.toml"),
        "[executor]\ndecimal_separator = \";\"\n",
    )
    .unwrap();

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    let err = ConfigValidator::validate(&config).unwrap_err();

    assert_eq!(err.code.as_str(), "CFG-VALIDATE-001");
    assert!(err.message.contains("decimal_separator"));
}

#[test]
fn test_env_var_documentation_lists_docplan_variables() {
    let docs = ConfigLoader::env_var_documentation();
    assert!(docs.iter().any(|line| line.starts_with("OLLAMA_HOST")));
    assert!(docs
        .iter()
        .any(|line| line.starts_with("DOCPLAN_EXECUTOR_PARALLEL_LIMIT")));
}
