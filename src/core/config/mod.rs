use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Engine configuration loaded from docplan.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EngineConfig {
    /// Semantic (LLM) service configuration
    #[serde(default)]
    pub semantic: SemanticConfig,

    /// Exchange-rate provider and cache configuration
    #[serde(default)]
    pub currency: CurrencyConfig,

    /// Unit conversion configuration
    #[serde(default)]
    pub units: UnitsConfig,

    /// Plan executor configuration
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Semantic service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SemanticConfig {
    /// Use the semantic service at all
    #[serde(default = "default_semantic_enabled")]
    pub enabled: bool,

    /// Ollama host URL
    #[serde(default = "default_host")]
    pub host: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f64,

    /// Reply token budget (num_predict)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum characters of document text sent per request
    #[serde(default = "default_input_limit")]
    pub input_limit: usize,

    #[serde(default = "default_semantic_timeout")]
    pub timeout_seconds: u64,
}

/// Currency configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrencyConfig {
    /// Directory for cached rate tables
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Freshness window for cached tables (humantime, e.g. "12h")
    #[serde(default = "default_ttl")]
    pub ttl: String,

    /// Primary endpoint template with `{date}` and `{base}` placeholders
    #[serde(default = "default_primary_url")]
    pub primary_url: String,

    /// Mirror endpoint template, tried when the primary fails
    #[serde(default = "default_mirror_url")]
    pub mirror_url: String,

    #[serde(default = "default_currency_timeout")]
    pub timeout_seconds: u64,

    /// Currencies used for triangulated crossings
    #[serde(default = "default_pivots")]
    pub pivots: Vec<String>,

    /// Relabel the currency field even when some amount failed to convert
    #[serde(default)]
    pub relabel_on_failure: bool,
}

/// Unit conversion configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitsConfig {
    /// Decimal places kept on converted magnitudes
    #[serde(default = "default_precision")]
    pub precision: usize,

    /// Ask the semantic service to convert when the deterministic pass converts nothing
    #[serde(default = "default_true")]
    pub semantic_fallback: bool,
}

/// Executor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutorConfig {
    /// Documents processed concurrently
    #[serde(default = "default_parallel_limit")]
    pub parallel_limit: usize,

    /// Run semantic cleanup on prose-like strings during the pre-pass
    #[serde(default)]
    pub text_cleanup: bool,

    #[serde(default = "default_cleanup_max_chars")]
    pub cleanup_max_chars: usize,

    /// Rewrite decimal strings during the post-pass
    #[serde(default = "default_true")]
    pub numeric_format: bool,

    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: String,

    /// Field delimiter for CSV exports
    #[serde(default = "default_csv_delimiter")]
    pub csv_delimiter: char,

    /// Base directory for relative export paths
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

impl CurrencyConfig {
    /// Parsed TTL. Falls back to 12h when the configured value does not parse.
    pub fn ttl_duration(&self) -> Duration {
        humantime::parse_duration(&self.ttl).unwrap_or(Duration::from_secs(12 * 3600))
    }
}

fn default_semantic_enabled() -> bool {
    true
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "qwen2.5:latest".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_input_limit() -> usize {
    12000
}

fn default_semantic_timeout() -> u64 {
    60
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".docplan/cache/rates")
}

fn default_ttl() -> String {
    "12h".to_string()
}

fn default_primary_url() -> String {
    "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@{date}/v1/currencies/{base}.json"
        .to_string()
}

fn default_mirror_url() -> String {
    "https://{date}.currency-api.pages.dev/v1/currencies/{base}.json".to_string()
}

fn default_currency_timeout() -> u64 {
    15
}

fn default_pivots() -> Vec<String> {
    vec!["usd".to_string(), "eur".to_string()]
}

fn default_precision() -> usize {
    6
}

fn default_parallel_limit() -> usize {
    4
}

fn default_cleanup_max_chars() -> usize {
    400
}

fn default_decimal_separator() -> String {
    ",".to_string()
}

fn default_csv_delimiter() -> char {
    ','
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for SemanticConfig {
    fn default() -> Self {
        SemanticConfig {
            enabled: default_semantic_enabled(),
            host: default_host(),
            model: default_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            input_limit: default_input_limit(),
            timeout_seconds: default_semantic_timeout(),
        }
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        CurrencyConfig {
            cache_dir: default_cache_dir(),
            ttl: default_ttl(),
            primary_url: default_primary_url(),
            mirror_url: default_mirror_url(),
            timeout_seconds: default_currency_timeout(),
            pivots: default_pivots(),
            relabel_on_failure: false,
        }
    }
}

impl Default for UnitsConfig {
    fn default() -> Self {
        UnitsConfig {
            precision: default_precision(),
            semantic_fallback: true,
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            parallel_limit: default_parallel_limit(),
            text_cleanup: false,
            cleanup_max_chars: default_cleanup_max_chars(),
            numeric_format: true,
            decimal_separator: default_decimal_separator(),
            csv_delimiter: default_csv_delimiter(),
            export_dir: default_export_dir(),
        }
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
