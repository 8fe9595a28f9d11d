#![allow(clippy::result_large_err)]

use super::EngineConfig;
use crate::core::error::{AppError, ErrorCode};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_FILE_NAME: &str = "docplan.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/docplan.toml)
    /// Environment variables override config file values; relative directories
    /// are resolved against the workspace.
    pub fn load_from_workspace(workspace_path: &Path) -> Result<EngineConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        let config_file = Self::load_from_file(&config_path)?;

        let mut config = config_file.unwrap_or_default();

        Self::apply_env_overrides(&mut config);
        Self::anchor_paths(&mut config, workspace_path);

        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<EngineConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(ErrorCode::ConfigUnreadable, "failed to read config file")
                .with_context("path", path.display().to_string())
                .caused_by(e)
        })?;

        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(ErrorCode::ConfigMalformed, "failed to parse config file")
                .with_context("path", path.display().to_string())
                .caused_by(e)
        })?;

        Ok(Some(config))
    }

    fn parsed<T: FromStr>(name: &str) -> Option<T> {
        env::var(name).ok().and_then(|raw| raw.trim().parse().ok())
    }

    /// Apply environment variable overrides to the configuration
    /// `DOCPLAN_*` variables win over the generic `OLLAMA_*` ones.
    fn apply_env_overrides(config: &mut EngineConfig) {
        // Semantic overrides
        if let Ok(host) = env::var("OLLAMA_HOST") {
            config.semantic.host = host;
        }
        if let Ok(model) = env::var("OLLAMA_MODEL") {
            config.semantic.model = model;
        }
        if let Some(enabled) = Self::parsed("DOCPLAN_SEMANTIC_ENABLED") {
            config.semantic.enabled = enabled;
        }
        if let Ok(host) = env::var("DOCPLAN_SEMANTIC_HOST") {
            config.semantic.host = host;
        }
        if let Ok(model) = env::var("DOCPLAN_SEMANTIC_MODEL") {
            config.semantic.model = model;
        }
        if let Some(timeout) = Self::parsed("DOCPLAN_SEMANTIC_TIMEOUT") {
            config.semantic.timeout_seconds = timeout;
        }

        // Currency overrides
        if let Ok(dir) = env::var("DOCPLAN_CURRENCY_CACHE_DIR") {
            config.currency.cache_dir = PathBuf::from(dir);
        }
        if let Ok(ttl) = env::var("DOCPLAN_CURRENCY_TTL") {
            config.currency.ttl = ttl;
        }
        if let Ok(url) = env::var("DOCPLAN_CURRENCY_PRIMARY_URL") {
            config.currency.primary_url = url;
        }
        if let Ok(url) = env::var("DOCPLAN_CURRENCY_MIRROR_URL") {
            config.currency.mirror_url = url;
        }

        // Units overrides
        if let Some(precision) = Self::parsed("DOCPLAN_UNITS_PRECISION") {
            config.units.precision = precision;
        }

        // Executor overrides
        if let Some(limit) = Self::parsed("DOCPLAN_EXECUTOR_PARALLEL_LIMIT") {
            config.executor.parallel_limit = limit;
        }
        if let Some(cleanup) = Self::parsed("DOCPLAN_EXECUTOR_TEXT_CLEANUP") {
            config.executor.text_cleanup = cleanup;
        }
        if let Ok(separator) = env::var("DOCPLAN_EXECUTOR_DECIMAL_SEPARATOR") {
            config.executor.decimal_separator = separator;
        }
        if let Some(delimiter) = Self::parsed("DOCPLAN_EXECUTOR_CSV_DELIMITER") {
            config.executor.csv_delimiter = delimiter;
        }
        if let Ok(dir) = env::var("DOCPLAN_EXECUTOR_EXPORT_DIR") {
            config.executor.export_dir = PathBuf::from(dir);
        }
    }

    fn anchor_paths(config: &mut EngineConfig, workspace_path: &Path) {
        if config.currency.cache_dir.is_relative() {
            config.currency.cache_dir = workspace_path.join(&config.currency.cache_dir);
        }
        if config.executor.export_dir.is_relative() {
            config.executor.export_dir = workspace_path.join(&config.executor.export_dir);
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "OLLAMA_HOST - Ollama host URL (default: http://localhost:11434)",
            "OLLAMA_MODEL - Ollama model name (default: qwen2.5:latest)",
            "DOCPLAN_SEMANTIC_ENABLED - Enable the semantic service (true/false, default: true)",
            "DOCPLAN_SEMANTIC_HOST - Override semantic host, wins over OLLAMA_HOST",
            "DOCPLAN_SEMANTIC_MODEL - Override semantic model, wins over OLLAMA_MODEL",
            "DOCPLAN_SEMANTIC_TIMEOUT - Semantic request timeout in seconds (default: 60)",
            "DOCPLAN_CURRENCY_CACHE_DIR - Rate cache directory (default: .docplan/cache/rates)",
            "DOCPLAN_CURRENCY_TTL - Rate cache freshness window (default: 12h)",
            "DOCPLAN_CURRENCY_PRIMARY_URL - Primary rate endpoint template",
            "DOCPLAN_CURRENCY_MIRROR_URL - Mirror rate endpoint template",
            "DOCPLAN_UNITS_PRECISION - Decimal places on converted magnitudes (default: 6)",
            "DOCPLAN_EXECUTOR_PARALLEL_LIMIT - Documents processed concurrently (default: 4)",
            "DOCPLAN_EXECUTOR_TEXT_CLEANUP - Semantic text cleanup in the pre-pass (true/false)",
            "DOCPLAN_EXECUTOR_DECIMAL_SEPARATOR - Decimal separator for the post-pass (default: ,)",
            "DOCPLAN_EXECUTOR_CSV_DELIMITER - Field delimiter for CSV exports (default: ,)",
            "DOCPLAN_EXECUTOR_EXPORT_DIR - Base directory for relative export paths",
        ]
    }
}
