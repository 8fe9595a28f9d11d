use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn docplan(workspace: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("docplan"));
    cmd.arg("--workspace")
        .arg(workspace.path())
        .env("DOCPLAN_SEMANTIC_ENABLED", "false")
        .env("DOCPLAN_LOG_CONSOLE", "none")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_plan_commands() {
    Command::new(assert_cmd::cargo::cargo_bin!("docplan"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("PLAN COMMANDS"))
        .stdout(predicate::str::contains("compile"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("rates"));
}

#[test]
fn test_apply_help_shows_example() {
    Command::new(assert_cmd::cargo::cargo_bin!("docplan"))
        .args(["apply", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--plan <FILE>"))
        .stdout(predicate::str::contains("docplan apply --plan plan.json"));
}

#[test]
fn test_version_flag() {
    Command::new(assert_cmd::cargo::cargo_bin!("docplan"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(docplan::VERSION));
}

#[test]
fn test_compile_rules_only_prints_plan_json() {
    let workspace = TempDir::new().unwrap();
    let output = docplan(&workspace)
        .args(["compile", "--rules-only", "formatear la fecha a dd/mm/aaaa"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let compiled: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(compiled["source"], "rules");
    assert_eq!(compiled["plan"][0]["op"], "format_date");
    assert_eq!(compiled["plan"][0]["output_fmt"], "%d/%m/%Y");
    assert!(workspace.path().join(".docplan/logs/docplan.log").exists());
}

#[test]
fn test_compile_without_recognizable_intent_fails() {
    let workspace = TempDir::new().unwrap();
    docplan(&workspace)
        .args(["compile", "hola"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PLAN-COMPILE-001"));
}

#[test]
fn test_apply_prints_summary() {
    let workspace = TempDir::new().unwrap();
    let plan = workspace.path().join("plan.json");
    let docs = workspace.path().join("docs.jsonl");
    fs::write(
        &plan,
        r#"{"plan": [{"op": "filter_compare", "column": "monto", "cmp": ">", "value": 100}]}"#,
    )
    .unwrap();
    fs::write(&docs, "{\"monto\": \"150\"}\n{\"monto\": \"50\"}\n").unwrap();

    let output = docplan(&workspace)
        .arg("apply")
        .arg("--plan")
        .arg(&plan)
        .arg(&docs)
        .output()
        .unwrap();

    assert!(output.status.success());
    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["documents"], serde_json::json!([{"monto": "150"}]));
    assert_eq!(summary["dropped"], serde_json::json!([1]));
}

#[test]
fn test_apply_with_missing_documents_fails() {
    let workspace = TempDir::new().unwrap();
    let plan = workspace.path().join("plan.json");
    fs::write(&plan, "[]").unwrap();

    docplan(&workspace)
        .arg("apply")
        .arg("--plan")
        .arg(&plan)
        .arg(workspace.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read documents"));
}

#[test]
fn test_json_log_lines_carry_command_and_execution_id() {
    let workspace = TempDir::new().unwrap();
    let plan = workspace.path().join("plan.json");
    let docs = workspace.path().join("docs.json");
    fs::write(&plan, r#"[{"op": "filter_equals", "column": "estado", "value": "pagada"}]"#).unwrap();
    fs::write(&docs, r#"[{"estado": "pagada"}]"#).unwrap();

    let output = docplan(&workspace)
        .env("DOCPLAN_LOG_FORMAT", "json")
        .arg("apply")
        .arg("--plan")
        .arg(&plan)
        .arg(&docs)
        .output()
        .unwrap();
    assert!(output.status.success());
    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();

    let log = fs::read_to_string(workspace.path().join(".docplan/logs/docplan.log")).unwrap();
    let finished: Value = log
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap())
        .find(|line| line["fields"]["message"] == "plan finished")
        .expect("plan finished event");
    assert_eq!(finished["spans"][0]["name"], "run");
    assert_eq!(finished["spans"][0]["command"], "apply");
    assert_eq!(finished["span"]["name"], "plan");
    assert_eq!(finished["span"]["execution_id"], summary["execution_id"]);
}
