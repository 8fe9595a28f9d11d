use clap::Parser;
use docplan::cli::{self, Args};
use docplan::logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let _guard = match logging::init(&args) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("warning: logging disabled: {:#}", err);
            None
        }
    };

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
