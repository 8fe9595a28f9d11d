//! Tracing setup for the `docplan` binary.
//!
//! Every command runs inside a `run` span (`run`, `command`) and every plan execution
//! inside a `plan` span (`execution_id`, `steps`), so the log file can be filtered down
//! to a single invocation or batch.

pub mod config;
pub mod layers;

pub use config::{FileFormat, LoggingConfig};
pub use layers::console::ConsoleOutput;

use crate::logging::layers::{console, file, BoxedLayer};
use crate::{cli::Args, Result};
use anyhow::{anyhow, Context};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::Layered;
use tracing_subscriber::prelude::*;
use tracing_subscriber::Registry;

type WithFileSink = Layered<Option<BoxedLayer<Registry>>, Registry>;

/// Flushes the file sink when dropped; hold it for the whole command.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber for the parsed command line.
///
/// `RUST_LOG` wins over `logging.level`. Fails when no workspace directory can be
/// determined or a subscriber is already installed.
pub fn init(args: &Args) -> Result<LoggingGuard> {
    let workspace = args
        .workspace_root()
        .ok_or_else(|| anyhow!("no workspace directory to hold logs"))?;
    let config = LoggingConfig::load(&workspace)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("failed to configure tracing level")?;

    let (file_layer, file_guard) = if config.file {
        let path = file::log_file_path(&config, &workspace)?;
        let (layer, guard) = file::file_layer::<Registry>(&path, config.file_format)?;
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };
    let console_layer = console::console_layer::<WithFileSink>(config.console, config.console_filter()?);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(env_filter)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(LoggingGuard { _file: file_guard })
}
