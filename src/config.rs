//! Run configuration.
//!
//! The outlets file is JSON shaped like:
//!
//! ```json
//! {
//!   "countries": {
//!     "United Kingdom": [
//!       { "id": "bbc", "name": "BBC News", "homepage": "https://www.bbc.co.uk",
//!         "feeds": ["https://feeds.bbci.co.uk/news/rss.xml"] }
//!     ]
//!   }
//! }
//! ```
//!
//! Countries are visited in file order. Everything else about a run (paths,
//! discovery, HTTP settings) lives in [`IngestConfig`], which is handed to
//! [`run_ingestion`](crate::ingest::run_ingestion) by the caller.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

use crate::error::ConfigError;
use crate::models::Outlet;

/// Identifying user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "BasedNewsBot/0.1";

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Parsed outlets file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutletsConfig {
    pub countries: IndexMap<String, Vec<Outlet>>,
}

impl OutletsConfig {
    /// Read and parse the outlets file at `path`.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            countries = config.countries.len(),
            outlets = config.countries.values().map(Vec::len).sum::<usize>(),
            "Loaded outlets config"
        );
        Ok(config)
    }

    /// Parse outlets JSON, filling in each outlet's `country`.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut config: OutletsConfig = serde_json::from_str(raw)?;
        for (country, outlets) in config.countries.iter_mut() {
            for outlet in outlets.iter_mut() {
                outlet.country = country.clone();
            }
        }
        Ok(config)
    }

    /// All outlets in country order, then file order.
    pub fn into_outlets(self) -> Vec<Outlet> {
        self.countries.into_values().flatten().collect()
    }
}

/// HTTP settings shared by every fetch of a run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Everything a single ingestion run needs.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub outlets: Vec<Outlet>,
    /// Root of the per-country, per-outlet JSONL files.
    pub out_dir: PathBuf,
    /// SQLite file backing the dedup cache.
    pub cache_path: PathBuf,
    /// Per-outlet metrics JSONL; skipped when `None`.
    pub metrics_path: Option<PathBuf>,
    /// Scan outlet homepages when no feeds are configured.
    pub discover: bool,
    pub fetch: FetchConfig,
    /// Article extractions in flight per feed. `1` keeps the run strictly sequential.
    pub article_concurrency: usize,
}

impl IngestConfig {
    /// Defaults for everything except the outlets and output locations.
    pub fn new(outlets: Vec<Outlet>, out_dir: impl Into<PathBuf>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            outlets,
            out_dir: out_dir.into(),
            cache_path: cache_path.into(),
            metrics_path: None,
            discover: false,
            fetch: FetchConfig::default(),
            article_concurrency: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "countries": {
            "Zambia": [
                {"id": "zn", "name": "Zambia News", "homepage": "https://zn.example", "feeds": ["https://zn.example/rss"]}
            ],
            "Albania": [
                {"id": "al1", "name": "First", "homepage": "https://al1.example", "feeds": []},
                {"id": "al2", "name": "Second", "type": "newspaper"}
            ]
        }
    }"#;

    #[test]
    fn test_from_json_preserves_country_order() {
        let config = OutletsConfig::from_json(SAMPLE).unwrap();
        let countries: Vec<&str> = config.countries.keys().map(String::as_str).collect();
        assert_eq!(countries, vec!["Zambia", "Albania"]);
    }

    #[test]
    fn test_from_json_fills_country_and_defaults() {
        let outlets = OutletsConfig::from_json(SAMPLE).unwrap().into_outlets();
        assert_eq!(outlets.len(), 3);
        assert_eq!(outlets[0].country, "Zambia");
        assert_eq!(outlets[0].feeds, vec!["https://zn.example/rss".to_string()]);
        assert_eq!(outlets[2].id, "al2");
        assert_eq!(outlets[2].country, "Albania");
        assert!(outlets[2].homepage.is_empty());
        assert!(outlets[2].feeds.is_empty());
    }

    #[test]
    fn test_from_json_rejects_missing_countries() {
        assert!(OutletsConfig::from_json(r#"{"outlets": []}"#).is_err());
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = OutletsConfig::load(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_invalid_json_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("outlets.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = OutletsConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_ingest_config_defaults() {
        let config = IngestConfig::new(vec![], "data/raw", "data/cache.sqlite");
        assert_eq!(config.fetch.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.fetch.timeout, Duration::from_secs(20));
        assert_eq!(config.article_concurrency, 1);
        assert!(!config.discover);
        assert!(config.metrics_path.is_none());
    }
}
