use super::CurrencyError;
use crate::core::config::CurrencyConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Where rate payloads come from.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Raw payload for `base` on `date` (`latest` or `YYYY-MM-DD`).
    async fn fetch(&self, base: &str, date: &str) -> Result<Value, CurrencyError>;
}

/// HTTP provider trying each endpoint template in order until one answers.
pub struct HttpRateSource {
    client: reqwest::Client,
    endpoints: Vec<String>,
}

impl HttpRateSource {
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Result<Self, CurrencyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CurrencyError::Network(e.to_string()))?;
        Ok(Self { client, endpoints })
    }

    pub fn from_config(config: &CurrencyConfig) -> Result<Self, CurrencyError> {
        Self::new(
            vec![config.primary_url.clone(), config.mirror_url.clone()],
            Duration::from_secs(config.timeout_seconds),
        )
    }

    fn render(template: &str, base: &str, date: &str) -> String {
        template
            .replace("{date}", date)
            .replace("{base}", &base.to_lowercase())
    }

    async fn fetch_one(&self, url: &str, base: &str) -> Result<Value, CurrencyError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CurrencyError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CurrencyError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let payload: Value = response
            .json()
            .await
            .map_err(|e| CurrencyError::InvalidResponse(e.to_string()))?;
        if payload.get(base.to_lowercase()).map_or(true, |v| !v.is_object()) {
            return Err(CurrencyError::InvalidResponse(format!(
                "{} has no '{}' table",
                url,
                base.to_lowercase()
            )));
        }
        Ok(payload)
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn fetch(&self, base: &str, date: &str) -> Result<Value, CurrencyError> {
        let mut last_error = CurrencyError::Network("no rate endpoints configured".to_string());
        for template in &self.endpoints {
            let url = Self::render(template, base, date);
            match self.fetch_one(&url, base).await {
                Ok(payload) => return Ok(payload),
                Err(err) => {
                    tracing::warn!(url = %url, error = %err, "rate endpoint failed");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}
