//! Shared state for one engine run: configuration, the unit registry, the semantic
//! collaborator, the currency converter and the text-cleanup memo.

use crate::core::config::EngineConfig;
use crate::core::currency::{CurrencyConverter, HttpRateSource, RateCache, RateSource};
use crate::core::error::{AppError, ErrorCode};
use crate::core::semantic::{DisabledSemanticService, OllamaSemanticService, SemanticService};
use crate::core::units::{UnitEngine, UnitRegistry};
use dashmap::DashMap;
use std::sync::Arc;

pub struct Environment {
    config: EngineConfig,
    units: UnitRegistry,
    semantic: Arc<dyn SemanticService>,
    currency: CurrencyConverter,
    cleanup_memo: DashMap<String, String>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("semantic", &self.semantic.name())
            .field("memo_entries", &self.cleanup_memo.len())
            .finish_non_exhaustive()
    }
}

impl Environment {
    pub fn builder(config: EngineConfig) -> EnvironmentBuilder {
        EnvironmentBuilder::new(config)
    }

    /// Production wiring: Ollama when enabled, HTTP rates with the file cache.
    pub fn from_config(config: EngineConfig) -> Result<Self, AppError> {
        EnvironmentBuilder::new(config).build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    pub fn semantic(&self) -> &dyn SemanticService {
        self.semantic.as_ref()
    }

    pub fn currency(&self) -> &CurrencyConverter {
        &self.currency
    }

    pub fn unit_engine(&self) -> UnitEngine<'_> {
        UnitEngine::new(&self.units, self.config.units.precision)
    }

    /// Semantic cleanup of `text`, memoized on the trimmed input. Failures return the
    /// input unchanged and are memoized too, so a dead service is asked once per string.
    pub async fn cleanup_text(&self, text: &str) -> String {
        let key = text.trim().to_string();
        if let Some(hit) = self.cleanup_memo.get(&key) {
            return hit.clone();
        }
        let cleaned = match self.semantic.cleanup_text(&key).await {
            Ok(cleaned) if !cleaned.trim().is_empty() => cleaned.trim().to_string(),
            Ok(_) => key.clone(),
            Err(err) => {
                tracing::debug!(error = %err, "text cleanup unavailable");
                key.clone()
            }
        };
        self.cleanup_memo.insert(key, cleaned.clone());
        cleaned
    }
}

pub struct EnvironmentBuilder {
    config: EngineConfig,
    semantic: Option<Arc<dyn SemanticService>>,
    rate_source: Option<Arc<dyn RateSource>>,
    rate_cache: Option<Option<RateCache>>,
}

impl EnvironmentBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            semantic: None,
            rate_source: None,
            rate_cache: None,
        }
    }

    pub fn semantic(mut self, service: Arc<dyn SemanticService>) -> Self {
        self.semantic = Some(service);
        self
    }

    pub fn rate_source(mut self, source: Arc<dyn RateSource>) -> Self {
        self.rate_source = Some(source);
        self
    }

    pub fn rate_cache(mut self, cache: RateCache) -> Self {
        self.rate_cache = Some(Some(cache));
        self
    }

    pub fn without_rate_cache(mut self) -> Self {
        self.rate_cache = Some(None);
        self
    }

    pub fn build(self) -> Result<Environment, AppError> {
        let config = self.config;

        let semantic: Arc<dyn SemanticService> = match self.semantic {
            Some(service) => service,
            None if config.semantic.enabled => {
                let service = OllamaSemanticService::new(config.semantic.clone()).map_err(|e| {
                    AppError::new(ErrorCode::SemanticClient, "failed to build semantic client")
                        .with_context("host", config.semantic.host.clone())
                        .caused_by(e)
                })?;
                Arc::new(service)
            }
            None => Arc::new(DisabledSemanticService),
        };

        let source: Arc<dyn RateSource> = match self.rate_source {
            Some(source) => source,
            None => {
                let source = HttpRateSource::from_config(&config.currency).map_err(|e| {
                    AppError::new(ErrorCode::RateClient, "failed to build rate client").caused_by(e)
                })?;
                Arc::new(source)
            }
        };

        let cache = self.rate_cache.unwrap_or_else(|| {
            Some(RateCache::new(
                config.currency.cache_dir.clone(),
                config.currency.ttl_duration(),
            ))
        });
        let currency = CurrencyConverter::new(source, cache, config.currency.pivots.clone())
            .with_ttl(config.currency.ttl_duration());

        tracing::debug!(semantic = semantic.name(), "environment ready");
        Ok(Environment {
            config,
            units: UnitRegistry::new(),
            semantic,
            currency,
            cleanup_memo: DashMap::new(),
        })
    }
}
