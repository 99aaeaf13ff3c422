//! Command-line interface definitions for news_ingest.
//!
//! All arguments can be provided via command-line flags or environment
//! variables.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use news_ingest::config::{DEFAULT_USER_AGENT, FetchConfig};

/// Fetch RSS/Atom feeds and store them as JSONL.
///
/// # Examples
///
/// ```sh
/// # Configured feeds only
/// news_ingest --config data/outlets.json --out data/raw
///
/// # Scan homepages of outlets without feeds, four article fetches at a time
/// news_ingest --discover --article-concurrency 4
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Outlets JSON file
    #[arg(long, env = "INGEST_CONFIG", default_value = "data/outlets.json")]
    pub config: PathBuf,

    /// Root directory of the per-country JSONL output
    #[arg(long, env = "INGEST_OUT", default_value = "data/raw")]
    pub out: PathBuf,

    /// Discover feeds from the homepage of outlets that list none
    #[arg(long, env = "INGEST_DISCOVER")]
    pub discover: bool,

    /// SQLite file remembering every emitted URL
    #[arg(long, env = "INGEST_CACHE", default_value = "data/ingest_cache.sqlite")]
    pub cache: PathBuf,

    /// Per-outlet metrics JSONL
    #[arg(long, env = "INGEST_METRICS", default_value = "data/metrics/ingest_counts.jsonl")]
    pub metrics: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, env = "INGEST_TIMEOUT_SECS", default_value_t = 20)]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[arg(long, env = "INGEST_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Article pages fetched at once per feed (1 = sequential)
    #[arg(long, env = "INGEST_ARTICLE_CONCURRENCY", default_value_t = 1)]
    pub article_concurrency: usize,
}

impl Cli {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["news_ingest"]);

        assert_eq!(cli.config, PathBuf::from("data/outlets.json"));
        assert_eq!(cli.out, PathBuf::from("data/raw"));
        assert!(!cli.discover);
        assert_eq!(cli.cache, PathBuf::from("data/ingest_cache.sqlite"));
        assert_eq!(cli.metrics, PathBuf::from("data/metrics/ingest_counts.jsonl"));
        assert_eq!(cli.article_concurrency, 1);

        let fetch = cli.fetch_config();
        assert_eq!(fetch.user_agent, "BasedNewsBot/0.1");
        assert_eq!(fetch.timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "news_ingest",
            "--config",
            "/etc/outlets.json",
            "--out",
            "/tmp/raw",
            "--discover",
            "--timeout-secs",
            "5",
            "--article-concurrency",
            "8",
        ]);

        assert_eq!(cli.config, PathBuf::from("/etc/outlets.json"));
        assert_eq!(cli.out, PathBuf::from("/tmp/raw"));
        assert!(cli.discover);
        assert_eq!(cli.fetch_config().timeout, Duration::from_secs(5));
        assert_eq!(cli.article_concurrency, 8);
    }
}
