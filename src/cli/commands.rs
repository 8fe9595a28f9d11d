use crate::{
    cli::args::{ApplyArgs, CompileArgs, RatesArgs, RunArgs},
    core::{
        config::{ConfigLoader, ConfigValidator},
        currency::normalize_code,
        EngineConfig, Environment, InstructionCompiler, Plan, PlanExecutor,
    },
    utils::serialization::{JsonSerializer, Serializer},
    utils::atomic_write,
    Result,
};
use anyhow::{anyhow, Context};
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn load_config(workspace: Option<&Path>) -> Result<EngineConfig> {
    let root = workspace.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let config = ConfigLoader::load_from_workspace(&root)?;
    ConfigValidator::validate(&config)?;
    Ok(config)
}

fn build_environment(workspace: Option<&Path>) -> Result<Arc<Environment>> {
    let config = load_config(workspace)?;
    tracing::debug!(?config, "loaded engine config");
    Ok(Arc::new(Environment::from_config(config)?))
}

/// Read a batch: a JSON array, a single JSON object, or JSON lines.
pub fn read_documents(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read documents {}", path.display()))?;
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(single @ Value::Object(_)) => Ok(vec![single]),
        Ok(other) => Err(anyhow!(
            "documents must be JSON objects, got {} in {}",
            other,
            path.display()
        )),
        Err(_) => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(number, line)| {
                serde_json::from_str(line).with_context(|| {
                    format!("invalid JSON on line {} of {}", number + 1, path.display())
                })
            })
            .collect(),
    }
}

pub fn read_plan(path: &Path) -> Result<Plan> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read plan {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid plan in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

async fn apply_plan(
    env: Arc<Environment>,
    plan: &Plan,
    documents: Vec<Value>,
    output: Option<&Path>,
) -> Result<()> {
    let executor = PlanExecutor::new(env);
    let summary = executor.execute(documents, plan).await;
    for diagnostic in &summary.diagnostics {
        tracing::warn!(%diagnostic, "diagnostic");
    }
    match output {
        Some(path) => {
            let bytes = JsonSerializer.serialize_batch(&summary.documents)?;
            atomic_write(path, &bytes)?;
            print_json(&json!({
                "output": path,
                "kept": summary.documents.len(),
                "dropped": summary.dropped,
                "diagnostics": summary.diagnostics,
            }))
        }
        None => print_json(&summary),
    }
}

pub async fn compile(workspace: Option<PathBuf>, args: CompileArgs) -> Result<()> {
    let env = build_environment(workspace.as_deref())?;
    let context = match &args.context {
        Some(path) => read_documents(path)?.into_iter().next(),
        None => None,
    };
    let compiled = InstructionCompiler::new(env)
        .rules_only(args.rules_only)
        .compile(&args.instruction, context.as_ref())
        .await?;
    print_json(&compiled)
}

pub async fn apply(workspace: Option<PathBuf>, args: ApplyArgs) -> Result<()> {
    let env = build_environment(workspace.as_deref())?;
    let plan = read_plan(&args.plan)?;
    let documents = read_documents(&args.documents)?;
    apply_plan(env, &plan, documents, args.output.as_deref()).await
}

pub async fn run(workspace: Option<PathBuf>, args: RunArgs) -> Result<()> {
    let env = build_environment(workspace.as_deref())?;
    let documents = read_documents(&args.documents)?;
    let compiled = InstructionCompiler::new(env.clone())
        .rules_only(args.rules_only)
        .compile(&args.instruction, documents.first())
        .await?;
    tracing::info!(source = %compiled.source, steps = compiled.plan.len(), "compiled instruction");
    apply_plan(env, &compiled.plan, documents, args.output.as_deref()).await
}

pub async fn rates(workspace: Option<PathBuf>, args: RatesArgs) -> Result<()> {
    let env = build_environment(workspace.as_deref())?;
    let base = normalize_code(&args.base)?;
    match &args.to {
        Some(to) => {
            let to = normalize_code(to)?;
            let rate = env.currency().rate(&base, &to, &args.date).await?;
            print_json(&json!({ "base": base, "to": to, "date": args.date, "rate": rate }))
        }
        None => {
            let table = env.currency().get_rates(&base, &args.date).await?;
            print_json(table.as_ref())
        }
    }
}
