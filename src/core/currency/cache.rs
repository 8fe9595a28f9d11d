use super::CurrencyError;
use crate::utils::files::atomic_write;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Rate tables on disk as `rates_{base}_{date}.json`, considered fresh for `ttl`.
#[derive(Debug, Clone)]
pub struct RateCache {
    dir: PathBuf,
    ttl: Duration,
}

impl RateCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, base: &str, date: &str) -> PathBuf {
        self.dir
            .join(format!("rates_{}_{}.json", base.to_lowercase(), date))
    }

    fn is_fresh(&self, path: &Path) -> bool {
        fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age < self.ttl)
    }

    /// The cached payload if present and younger than the TTL.
    pub fn load_fresh(&self, base: &str, date: &str) -> Result<Option<Value>, CurrencyError> {
        let path = self.path_for(base, date);
        if !self.is_fresh(&path) {
            return Ok(None);
        }
        let content = fs::read(&path)
            .map_err(|e| CurrencyError::Cache(format!("{}: {}", path.display(), e)))?;
        let payload = serde_json::from_slice(&content)
            .map_err(|e| CurrencyError::Cache(format!("{}: {}", path.display(), e)))?;
        Ok(Some(payload))
    }

    pub fn store(&self, base: &str, date: &str, payload: &Value) -> Result<PathBuf, CurrencyError> {
        let path = self.path_for(base, date);
        let body = serde_json::to_vec(payload).map_err(|e| CurrencyError::Cache(e.to_string()))?;
        atomic_write(&path, &body).map_err(|e| CurrencyError::Cache(e.message))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn stored_tables_are_fresh_within_ttl() {
        let dir = TempDir::new().unwrap();
        let cache = RateCache::new(dir.path(), Duration::from_secs(3600));
        let payload = json!({"usd": {"ars": 900.0}});
        let path = cache.store("USD", "latest", &payload).unwrap();
        assert_eq!(path.file_name().unwrap(), "rates_usd_latest.json");
        assert_eq!(cache.load_fresh("usd", "latest").unwrap(), Some(payload));
    }

    #[test]
    fn zero_ttl_never_hits() {
        let dir = TempDir::new().unwrap();
        let cache = RateCache::new(dir.path(), Duration::ZERO);
        cache.store("usd", "latest", &json!({"usd": {}})).unwrap();
        assert_eq!(cache.load_fresh("usd", "latest").unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let cache = RateCache::new(dir.path(), Duration::from_secs(3600));
        fs::write(cache.path_for("usd", "latest"), "{not json").unwrap();
        assert!(matches!(
            cache.load_fresh("usd", "latest"),
            Err(CurrencyError::Cache(_))
        ));
    }

    #[test]
    fn missing_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = RateCache::new(dir.path().join("absent"), Duration::from_secs(3600));
        assert_eq!(cache.load_fresh("eur", "2024-01-05").unwrap(), None);
    }
}
