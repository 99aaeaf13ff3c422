//! Data models flowing through the ingestion pipeline.
//!
//! - [`Outlet`]: a configured news source, immutable for the run
//! - [`FeedItem`]: one parsed feed entry, before extraction
//! - [`ArticleRecord`]: the normalized unit appended to the output sink
//! - [`SeenEntry`]: one row of the dedup cache

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::utils::utc_now_iso;

/// A news outlet from the configuration file.
///
/// `country` is not part of the outlet JSON object; it is filled in from the
/// enclosing `countries` key when the configuration is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Outlet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub homepage: String,
    /// Feed URLs in the order they are ingested.
    #[serde(default)]
    pub feeds: Vec<String>,
    #[serde(skip)]
    pub country: String,
}

/// One entry of an RSS or Atom document.
///
/// Text fields are trimmed; elements missing from the document (or empty)
/// are `None`. `published` is kept verbatim since formats vary by source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub url: Option<String>,
    /// Only populated for RSS; Atom ids are not carried.
    pub guid: Option<String>,
    pub published: Option<String>,
    pub summary: Option<String>,
}

impl FeedItem {
    /// The URL an article record is keyed on: the link, else the guid.
    pub fn record_url(&self) -> &str {
        self.url
            .as_deref()
            .or(self.guid.as_deref())
            .unwrap_or_default()
    }
}

/// A normalized, persisted article.
///
/// Field order here is the field order of every JSONL line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// Hex SHA-256 over `url + "|" + title`, see [`record_id`].
    pub id: String,
    pub title: Option<String>,
    pub url: String,
    pub published: Option<String>,
    pub summary: Option<String>,
    pub outlet_id: String,
    pub outlet_name: String,
    pub country: String,
    pub feed_url: String,
    /// UTC, ISO-8601 with a `Z` suffix.
    pub ingested_at: String,
    pub full_text: Option<String>,
}

impl ArticleRecord {
    /// Build the record for `item` found in `feed_url` of `outlet`.
    pub fn from_item(
        item: &FeedItem,
        outlet: &Outlet,
        feed_url: &str,
        full_text: Option<String>,
    ) -> Self {
        let url = item.record_url().to_string();
        let id = record_id(&url, item.title.as_deref().unwrap_or_default());
        Self {
            id,
            title: item.title.clone(),
            url,
            published: item.published.clone(),
            summary: item.summary.clone(),
            outlet_id: outlet.id.clone(),
            outlet_name: outlet.name.clone(),
            country: outlet.country.clone(),
            feed_url: feed_url.to_string(),
            ingested_at: utc_now_iso(),
            full_text,
        }
    }
}

/// Content fingerprint of an article: hex SHA-256 of `url|title`.
///
/// Pure in its inputs, so re-ingesting the same `(url, title)` always yields
/// the same id regardless of the dedup cache.
pub fn record_id(url: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"|");
    hasher.update(title.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One dedup cache row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenEntry {
    pub url: String,
    pub first_seen: String,
}
