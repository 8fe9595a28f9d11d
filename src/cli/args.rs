use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Instruction in natural language (Spanish or English)
    #[arg(value_name = "INSTRUCTION")]
    pub instruction: String,

    /// JSON file with a sample document sent to the semantic compiler as context
    #[arg(long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// Skip the semantic service and use the rule compiler only
    #[arg(long)]
    pub rules_only: bool,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Plan file: a JSON array of steps or an object with a `plan` key
    #[arg(long, value_name = "FILE")]
    pub plan: PathBuf,

    /// Documents file: a JSON array, a single JSON object, or JSON lines
    #[arg(value_name = "DOCUMENTS")]
    pub documents: PathBuf,

    /// Write the surviving documents here instead of printing the full summary
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Instruction in natural language (Spanish or English)
    #[arg(value_name = "INSTRUCTION")]
    pub instruction: String,

    /// Documents file: a JSON array, a single JSON object, or JSON lines
    #[arg(value_name = "DOCUMENTS")]
    pub documents: PathBuf,

    /// Skip the semantic service and use the rule compiler only
    #[arg(long)]
    pub rules_only: bool,

    /// Write the surviving documents here instead of printing the full summary
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RatesArgs {
    /// Base currency code (e.g. usd)
    #[arg(value_name = "BASE")]
    pub base: String,

    /// Table date (YYYY-MM-DD) or `latest`
    #[arg(long, default_value = "latest")]
    pub date: String,

    /// Show a single crossing instead of the whole table
    #[arg(long, value_name = "CODE")]
    pub to: Option<String>,
}
