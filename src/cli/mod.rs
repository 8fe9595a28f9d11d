pub mod args;
pub mod commands;

pub use args::{ApplyArgs, CompileArgs, RatesArgs, RunArgs};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Instrument;
use uuid::Uuid;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
PLAN COMMANDS:\n{subcommands}\n";

#[derive(Parser, Debug)]
#[command(name = "docplan")]
#[command(version = crate::VERSION)]
#[command(about = "Compile natural-language instructions into transformation plans and apply them to documents")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: compile an instruction, review the plan, then apply it to a batch of documents."
)]
pub struct Args {
    /// Directory holding docplan.toml and the .docplan/ state (default: current directory)
    #[arg(long, global = true, value_name = "PATH", env = "DOCPLAN_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn workspace_root(&self) -> Option<PathBuf> {
        self.workspace
            .clone()
            .or_else(|| std::env::current_dir().ok())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        about = "Compile an instruction into a plan",
        long_about = "Compile tries the semantic compiler first and falls back to the rule compiler, then prints the plan with its source and decisions as JSON.",
        after_help = "Example:\n    docplan compile \"convertí largo y ancho a mm\" --rules-only"
    )]
    Compile(CompileArgs),
    #[command(
        about = "Apply a plan to a batch of documents",
        long_about = "Apply runs every step of the plan over each document and prints the surviving documents, diagnostics, conversions and dropped indices.",
        after_help = "Example:\n    docplan apply --plan plan.json facturas.json"
    )]
    Apply(ApplyArgs),
    #[command(
        about = "Compile an instruction and apply it",
        long_about = "Run is compile followed by apply, in one invocation.",
        after_help = "Example:\n    docplan run \"pasá los montos a euros\" facturas.json"
    )]
    Run(RunArgs),
    #[command(
        about = "Show exchange rates",
        long_about = "Rates prints the rate table for a base currency, or a single crossing with --to, using the configured provider and cache.",
        after_help = "Example:\n    docplan rates usd --to eur"
    )]
    Rates(RatesArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Compile(_) => "compile",
            Command::Apply(_) => "apply",
            Command::Run(_) => "run",
            Command::Rates(_) => "rates",
        }
    }
}

/// Dispatch a parsed command inside a `run` span that tags every event it logs.
pub async fn run(args: Args) -> crate::Result<()> {
    let workspace = args.workspace_root();
    let span = tracing::info_span!("run", run = %Uuid::new_v4(), command = args.command.name());
    async move {
        match args.command {
            Command::Compile(compile_args) => commands::compile(workspace, compile_args).await,
            Command::Apply(apply_args) => commands::apply(workspace, apply_args).await,
            Command::Run(run_args) => commands::run(workspace, run_args).await,
            Command::Rates(rates_args) => commands::rates(workspace, rates_args).await,
        }
    }
    .instrument(span)
    .await
}
