#![allow(clippy::result_large_err)]

use super::EngineConfig;
use crate::core::error::{AppError, ErrorCode};
use url::Url;

pub struct ConfigValidator;

fn invalid(message: impl Into<String>) -> AppError {
    AppError::new(ErrorCode::ConfigInvalid, message)
}

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &EngineConfig) -> Result<(), AppError> {
        if config.semantic.enabled && config.semantic.host.trim().is_empty() {
            return Err(invalid("semantic.host cannot be empty when semantic.enabled is true"));
        }
        if config.semantic.enabled {
            let parsed = Url::parse(&config.semantic.host)
                .map_err(|err| invalid(format!("invalid semantic.host: {}", err)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(invalid("semantic.host must be an http(s) URL"));
            }
        }
        if !(0.0..=2.0).contains(&config.semantic.temperature) {
            return Err(invalid("semantic.temperature must be between 0.0 and 2.0"));
        }

        for (name, template) in [
            ("currency.primary_url", &config.currency.primary_url),
            ("currency.mirror_url", &config.currency.mirror_url),
        ] {
            if !template.contains("{base}") {
                return Err(invalid(format!("{} must contain a {{base}} placeholder", name)));
            }
        }
        if humantime::parse_duration(&config.currency.ttl).is_err() {
            return Err(invalid(format!(
                "currency.ttl '{}' is not a valid duration",
                config.currency.ttl
            )));
        }

        if config.units.precision > 12 {
            return Err(invalid("units.precision must be at most 12"));
        }
        if config.executor.parallel_limit == 0 {
            return Err(invalid("executor.parallel_limit must be at least 1"));
        }
        if !matches!(config.executor.decimal_separator.as_str(), "," | ".") {
            return Err(invalid("executor.decimal_separator must be ',' or '.'"));
        }
        let delimiter = config.executor.csv_delimiter;
        if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
            return Err(invalid(format!(
                "executor.csv_delimiter {:?} must be a single ASCII character other than a quote or newline",
                delimiter
            )));
        }

        Ok(())
    }
}
