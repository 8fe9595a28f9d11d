//! Exchange rates with a file cache and triangulated crossings.
//!
//! Rate tables come from a [`RateSource`] keyed by `(base, date)`, are persisted by
//! [`RateCache`] and memoized in memory for the cache TTL. A failed fetch is
//! remembered for a short backoff so a provider outage costs one timeout per table.

pub mod cache;
pub mod provider;

pub use cache::RateCache;
pub use provider::{HttpRateSource, RateSource};

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurrencyError {
    #[error("no crossing available {from}->{to} for {date}")]
    NoCrossing {
        from: String,
        to: String,
        date: String,
    },

    #[error("rate request failed: {0}")]
    Network(String),

    #[error("rate endpoint {url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid rate payload: {0}")]
    InvalidResponse(String),

    #[error("invalid currency code '{0}'")]
    InvalidCode(String),

    #[error("rate cache error: {0}")]
    Cache(String),
}

/// Rates relative to `base` for one date: `1 base = rates[code] code`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateTable {
    pub base: String,
    pub date: String,
    pub rates: BTreeMap<String, f64>,
}

impl RateTable {
    /// Parse a provider payload shaped like `{"date": "...", "<base>": {"<code>": rate}}`.
    pub fn from_payload(base: &str, date: &str, payload: &Value) -> Result<Self, CurrencyError> {
        let base = base.to_lowercase();
        let entries = payload
            .get(&base)
            .and_then(Value::as_object)
            .ok_or_else(|| CurrencyError::InvalidResponse(format!("missing key '{}'", base)))?;
        let rates = entries
            .iter()
            .filter_map(|(code, rate)| Some((code.to_lowercase(), rate.as_f64()?)))
            .filter(|(_, rate)| rate.is_finite() && *rate > 0.0)
            .collect();
        let date = payload
            .get("date")
            .and_then(Value::as_str)
            .unwrap_or(date)
            .to_string();
        Ok(Self { base, date, rates })
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        if code == self.base {
            return Some(1.0);
        }
        self.rates.get(code).copied()
    }
}

/// Lowercase a three-letter ISO 4217 code.
pub fn normalize_code(code: &str) -> Result<String, CurrencyError> {
    let code = code.trim().to_lowercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(CurrencyError::InvalidCode(code))
    }
}

/// How long a failed `(base, date)` fetch is answered from memory.
pub const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_secs(60);
const DEFAULT_MEMO_TTL: Duration = Duration::from_secs(12 * 3600);

type TableKey = (String, String);

pub struct CurrencyConverter {
    source: Arc<dyn RateSource>,
    cache: Option<RateCache>,
    pivots: Vec<String>,
    ttl: Duration,
    failure_backoff: Duration,
    tables: DashMap<TableKey, (Arc<RateTable>, Instant)>,
    failures: DashMap<TableKey, (CurrencyError, Instant)>,
}

impl CurrencyConverter {
    pub fn new(source: Arc<dyn RateSource>, cache: Option<RateCache>, pivots: Vec<String>) -> Self {
        Self {
            source,
            cache,
            pivots: pivots.into_iter().map(|p| p.to_lowercase()).collect(),
            ttl: DEFAULT_MEMO_TTL,
            failure_backoff: DEFAULT_FAILURE_BACKOFF,
            tables: DashMap::new(),
            failures: DashMap::new(),
        }
    }

    /// Age after which a memoized table is fetched again.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    /// Rate table for `base` on `date`: memo, then fresh cache file, then the source.
    pub async fn get_rates(&self, base: &str, date: &str) -> Result<Arc<RateTable>, CurrencyError> {
        let base = normalize_code(base)?;
        let key = (base.clone(), date.to_string());
        let memo = self.tables.get(&key).map(|entry| entry.value().clone());
        if let Some((table, stored_at)) = memo {
            if stored_at.elapsed() < self.ttl {
                return Ok(table);
            }
            tracing::debug!(base = %base, date = %date, "memoized rate table expired");
        }
        let failed = self.failures.get(&key).map(|entry| entry.value().clone());
        if let Some((err, failed_at)) = failed {
            if failed_at.elapsed() < self.failure_backoff {
                return Err(err);
            }
        }

        match self.load_table(&base, date).await {
            Ok(table) => {
                self.failures.remove(&key);
                self.tables.insert(key, (table.clone(), Instant::now()));
                Ok(table)
            }
            Err(err) => {
                tracing::warn!(base = %base, date = %date, error = %err, "rate table unavailable");
                self.failures.insert(key, (err.clone(), Instant::now()));
                Err(err)
            }
        }
    }

    async fn load_table(&self, base: &str, date: &str) -> Result<Arc<RateTable>, CurrencyError> {
        if let Some(cache) = &self.cache {
            match cache.load_fresh(base, date) {
                Ok(Some(payload)) => {
                    let table = Arc::new(RateTable::from_payload(base, date, &payload)?);
                    tracing::debug!(base = %base, date = %date, "rate table served from cache");
                    return Ok(table);
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "ignoring unreadable rate cache"),
            }
        }

        let payload = self.source.fetch(base, date).await?;
        let table = Arc::new(RateTable::from_payload(base, date, &payload)?);
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.store(base, date, &payload) {
                tracing::warn!(error = %err, base = %base, "failed to persist rate table");
            }
        }
        tracing::info!(base = %base, date = %date, codes = table.rates.len(), "fetched rate table");
        Ok(table)
    }

    async fn direct(&self, from: &str, to: &str, date: &str) -> Option<f64> {
        match self.get_rates(from, date).await {
            Ok(table) => table.rate(to),
            Err(err) => {
                tracing::debug!(base = %from, error = %err, "rate table unavailable");
                None
            }
        }
    }

    /// One leg of a crossing: direct table first, then the inverse table.
    async fn leg(&self, from: &str, to: &str, date: &str) -> Option<f64> {
        if let Some(rate) = self.direct(from, to, date).await {
            return Some(rate);
        }
        self.direct(to, from, date).await.map(|inverse| 1.0 / inverse)
    }

    /// Multiplier turning an amount in `from` into `to`.
    pub async fn rate(&self, from: &str, to: &str, date: &str) -> Result<f64, CurrencyError> {
        let from = normalize_code(from)?;
        let to = normalize_code(to)?;
        if from == to {
            return Ok(1.0);
        }
        if let Some(rate) = self.leg(&from, &to, date).await {
            return Ok(rate);
        }
        for pivot in &self.pivots {
            if *pivot == from || *pivot == to {
                continue;
            }
            let Some(first) = self.leg(&from, pivot, date).await else {
                continue;
            };
            if let Some(second) = self.leg(pivot, &to, date).await {
                tracing::debug!(from = %from, to = %to, pivot = %pivot, "triangulated crossing");
                return Ok(first * second);
            }
        }
        Err(CurrencyError::NoCrossing {
            from: from.to_uppercase(),
            to: to.to_uppercase(),
            date: date.to_string(),
        })
    }

    pub async fn convert(
        &self,
        amount: f64,
        from: &str,
        to: &str,
        date: &str,
    ) -> Result<f64, CurrencyError> {
        Ok(amount * self.rate(from, to, date).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        tables: HashMap<&'static str, Value>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateSource for StaticSource {
        async fn fetch(&self, base: &str, _date: &str) -> Result<Value, CurrencyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tables
                .get(base)
                .cloned()
                .ok_or_else(|| CurrencyError::Status {
                    url: base.to_string(),
                    status: 404,
                })
        }
    }

    fn usd_only() -> Arc<StaticSource> {
        Arc::new(StaticSource {
            tables: HashMap::from([(
                "usd",
                json!({"date": "2024-01-05", "usd": {"eur": 0.9, "ars": 900.0}}),
            )]),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn identity_needs_no_rates() {
        let source = usd_only();
        let converter = CurrencyConverter::new(source.clone(), None, vec![]);
        assert_eq!(converter.convert(5.0, "ARS", "ars", "latest").await.unwrap(), 5.0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn inverse_table_is_used() {
        let converter = CurrencyConverter::new(usd_only(), None, vec![]);
        let value = converter.convert(900.0, "ars", "usd", "latest").await.unwrap();
        assert!((value - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn triangulates_through_pivot() {
        let converter =
            CurrencyConverter::new(usd_only(), None, vec!["usd".into(), "eur".into()]);
        let value = converter.convert(1.0, "EUR", "ARS", "latest").await.unwrap();
        assert!((value - 1000.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn missing_crossing_is_an_error() {
        let converter = CurrencyConverter::new(usd_only(), None, vec!["usd".into()]);
        let err = converter.convert(1.0, "jpy", "brl", "latest").await.unwrap_err();
        assert!(matches!(err, CurrencyError::NoCrossing { .. }));
    }

    #[tokio::test]
    async fn tables_are_memoized() {
        let source = usd_only();
        let converter = CurrencyConverter::new(source.clone(), None, vec![]);
        converter.convert(1.0, "usd", "ars", "latest").await.unwrap();
        converter.convert(2.0, "usd", "eur", "latest").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetches_are_not_repeated_within_the_backoff() {
        let source = usd_only();
        let converter = CurrencyConverter::new(source.clone(), None, vec![]);
        for _ in 0..3 {
            let err = converter.convert(1.0, "jpy", "brl", "latest").await.unwrap_err();
            assert!(matches!(err, CurrencyError::NoCrossing { .. }));
        }
        // One fetch for the jpy table and one for the inverse brl table.
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_backoff_retries_the_source() {
        let source = usd_only();
        let converter = CurrencyConverter::new(source.clone(), None, vec![])
            .with_failure_backoff(Duration::ZERO);
        assert!(converter.get_rates("jpy", "latest").await.is_err());
        assert!(converter.get_rates("jpy", "latest").await.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_memo_is_refreshed() {
        let source = usd_only();
        let converter =
            CurrencyConverter::new(source.clone(), None, vec![]).with_ttl(Duration::ZERO);
        converter.convert(1.0, "usd", "ars", "latest").await.unwrap();
        converter.convert(1.0, "usd", "ars", "latest").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn codes_must_be_three_letters() {
        assert_eq!(normalize_code(" USD ").unwrap(), "usd");
        assert!(normalize_code("dollars").is_err());
        assert!(normalize_code("u$d").is_err());
    }

    #[test]
    fn payload_without_base_is_rejected() {
        let err = RateTable::from_payload("usd", "latest", &json!({"eur": {}})).unwrap_err();
        assert!(matches!(err, CurrencyError::InvalidResponse(_)));
    }
}
