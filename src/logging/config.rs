//! Logging settings.
//!
//! Read from the `[logging]` table of `<workspace>/.docplan/logging.toml`, then from
//! `DOCPLAN_LOG_*` variables. Missing keys keep their defaults.

use crate::logging::layers::console::ConsoleOutput;
use crate::Result;
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// Per-workspace state directory that also holds the rate cache and logs.
pub const STATE_DIR: &str = ".docplan";
pub const LOGGING_FILE_NAME: &str = "logging.toml";

/// Layout of the log file. `json` puts the run and plan span fields on every line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "text" => Ok(FileFormat::Text),
            "json" => Ok(FileFormat::Json),
            other => Err(format!("invalid logging.file_format '{}'; expected text or json", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directives for the whole subscriber. `RUST_LOG` wins over this.
    pub level: String,
    /// Relative paths are resolved against the workspace and must stay inside it.
    pub log_dir: Option<PathBuf>,
    pub file: bool,
    pub file_format: FileFormat,
    pub console: ConsoleOutput,
    /// Stdout carries command results, so the console only shows warnings by default.
    pub console_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            file: true,
            file_format: FileFormat::Text,
            console: ConsoleOutput::Stderr,
            console_level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LoggingFile {
    #[serde(default)]
    logging: LoggingConfig,
}

impl LoggingConfig {
    pub fn load(workspace: &Path) -> Result<Self> {
        let path = workspace.join(STATE_DIR).join(LOGGING_FILE_NAME);
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read logging config {}", path.display()))?;
            toml::from_str::<LoggingFile>(&content)
                .with_context(|| format!("failed to parse logging config {}", path.display()))?
                .logging
        } else {
            LoggingConfig::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(level) = non_empty_var("DOCPLAN_LOG_LEVEL") {
            self.level = level;
        }
        if let Some(dir) = non_empty_var("DOCPLAN_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(enabled) = non_empty_var("DOCPLAN_LOG_FILE") {
            self.file = !matches!(enabled.to_lowercase().as_str(), "0" | "false" | "off" | "no");
        }
        if let Some(format) = non_empty_var("DOCPLAN_LOG_FORMAT") {
            self.file_format = format.parse().map_err(|e: String| anyhow!(e))?;
        }
        if let Some(console) = non_empty_var("DOCPLAN_LOG_CONSOLE") {
            self.console = console.parse().map_err(|e: String| anyhow!(e))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        EnvFilter::try_new(&self.level)
            .map_err(|e| anyhow!("invalid logging.level '{}': {}", self.level, e))?;
        self.console_filter()?;
        Ok(())
    }

    pub fn console_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(self.console_level.trim())
            .map_err(|_| anyhow!("invalid logging.console_level '{}'", self.console_level))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
