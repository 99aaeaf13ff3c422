//! Persistent record of every article URL ever emitted.
//!
//! Backed by a single SQLite table:
//!
//! ```sql
//! CREATE TABLE seen_urls (url TEXT PRIMARY KEY, first_seen TEXT)
//! ```
//!
//! Rows are never updated or deleted. [`SeenCache::mark_seen`] only stages a
//! URL in memory; staged URLs count as seen immediately but reach disk in one
//! transaction on [`SeenCache::commit`], which the orchestrator calls once per
//! outlet. A crash between an append to the output log and the next commit can
//! therefore re-emit those URLs on the following run.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::error::CacheError;
use crate::models::SeenEntry;
use crate::utils::utc_now_iso;

pub struct SeenCache {
    pool: SqlitePool,
    pending: Vec<SeenEntry>,
    pending_urls: HashSet<String>,
}

impl SeenCache {
    /// Open (or create) the cache database at `path`, creating parent directories.
    ///
    /// # Arguments
    ///
    /// * `path` - SQLite file; created along with its table on first use
    ///
    /// # Errors
    ///
    /// [`CacheError::CreateDir`] if the parent directory cannot be created,
    /// [`CacheError::Database`] if the file cannot be opened or the table
    /// cannot be created.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query("CREATE TABLE IF NOT EXISTS seen_urls (url TEXT PRIMARY KEY, first_seen TEXT)")
            .execute(&pool)
            .await?;

        info!("Dedup cache ready");
        Ok(Self {
            pool,
            pending: Vec::new(),
            pending_urls: HashSet::new(),
        })
    }

    /// Whether `url` was emitted before, including URLs staged this run.
    pub async fn is_seen(&self, url: &str) -> Result<bool, CacheError> {
        if self.pending_urls.contains(url) {
            return Ok(true);
        }
        let row = sqlx::query("SELECT 1 FROM seen_urls WHERE url = ? LIMIT 1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Stage `url` as seen now. Repeated calls keep the first timestamp.
    pub fn mark_seen(&mut self, url: &str) {
        if self.pending_urls.insert(url.to_string()) {
            self.pending.push(SeenEntry {
                url: url.to_string(),
                first_seen: utc_now_iso(),
            });
        }
    }

    /// URLs staged since the last commit.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Write staged URLs in one transaction. Existing rows are left untouched.
    #[instrument(level = "debug", skip_all, fields(pending = self.pending.len()))]
    pub async fn commit(&mut self) -> Result<usize, CacheError> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        for entry in &self.pending {
            sqlx::query("INSERT OR IGNORE INTO seen_urls (url, first_seen) VALUES (?, ?)")
                .bind(entry.url.as_str())
                .bind(entry.first_seen.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        let written = self.pending.len();
        self.pending.clear();
        self.pending_urls.clear();
        debug!(written, "Committed dedup cache");
        Ok(written)
    }

    /// Persisted row for `url`, if any.
    pub async fn entry(&self, url: &str) -> Result<Option<SeenEntry>, CacheError> {
        let first_seen: Option<Option<String>> =
            sqlx::query_scalar("SELECT first_seen FROM seen_urls WHERE url = ?")
                .bind(url)
                .fetch_optional(&self.pool)
                .await?;
        Ok(first_seen.map(|first_seen| SeenEntry {
            url: url.to_string(),
            first_seen: first_seen.unwrap_or_default(),
        }))
    }

    /// Number of persisted URLs.
    pub async fn len(&self) -> Result<u64, CacheError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seen_urls")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Close the pool. Staged but uncommitted URLs are dropped.
    pub async fn close(self) {
        if !self.pending.is_empty() {
            debug!(dropped = self.pending.len(), "Closing cache with uncommitted URLs");
        }
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mark_and_commit_persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/cache.sqlite");

        let mut cache = SeenCache::open(&path).await.unwrap();
        assert!(!cache.is_seen("https://example.com/a").await.unwrap());
        cache.mark_seen("https://example.com/a");
        assert!(cache.is_seen("https://example.com/a").await.unwrap());
        assert_eq!(cache.commit().await.unwrap(), 1);
        cache.close().await;

        let cache = SeenCache::open(&path).await.unwrap();
        assert!(cache.is_seen("https://example.com/a").await.unwrap());
        assert!(!cache.is_seen("https://example.com/b").await.unwrap());
        assert_eq!(cache.len().await.unwrap(), 1);
        cache.close().await;
    }

    #[tokio::test]
    async fn test_uncommitted_urls_are_lost_on_close() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cache.sqlite");

        let mut cache = SeenCache::open(&path).await.unwrap();
        cache.mark_seen("https://example.com/a");
        assert_eq!(cache.pending(), 1);
        cache.close().await;

        let cache = SeenCache::open(&path).await.unwrap();
        assert!(!cache.is_seen("https://example.com/a").await.unwrap());
        cache.close().await;
    }

    #[tokio::test]
    async fn test_mark_seen_is_idempotent_and_keeps_first_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = SeenCache::open(&tmp.path().join("cache.sqlite")).await.unwrap();

        cache.mark_seen("https://example.com/a");
        cache.mark_seen("https://example.com/a");
        assert_eq!(cache.pending(), 1);
        cache.commit().await.unwrap();
        let first = cache.entry("https://example.com/a").await.unwrap().unwrap();

        cache.mark_seen("https://example.com/a");
        cache.commit().await.unwrap();
        let second = cache.entry("https://example.com/a").await.unwrap().unwrap();

        assert_eq!(first, second);
        assert!(first.first_seen.ends_with('Z'));
        assert_eq!(cache.len().await.unwrap(), 1);
        cache.close().await;
    }

    #[tokio::test]
    async fn test_lookup_is_exact_string_match() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = SeenCache::open(&tmp.path().join("cache.sqlite")).await.unwrap();
        cache.mark_seen("https://example.com/a");
        cache.commit().await.unwrap();

        assert!(!cache.is_seen("https://example.com/a/").await.unwrap());
        assert!(!cache.is_seen("HTTPS://EXAMPLE.COM/a").await.unwrap());
        assert_eq!(cache.entry("https://example.com/b").await.unwrap(), None);
        assert_eq!(cache.commit().await.unwrap(), 0);
        cache.close().await;
    }
}
