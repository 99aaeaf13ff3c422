//! Typed errors for the ingestion pipeline.
//!
//! Failures are grouped by the scope they can take down:
//!
//! | Error | Scope | Handling |
//! |-------|-------|----------|
//! | [`FetchError`] | one request | feed skipped, or article skipped |
//! | [`FeedError`] | one feed document | feed skipped |
//! | [`ConfigError`] | whole run | aborts before any outlet |
//! | [`CacheError`] / [`SinkError`] | whole run | aborts, see [`IngestError`] |
//!
//! Feed- and item-level failures never leave the orchestrator as errors; they
//! are rendered into the run [`Report`](crate::ingest::Report) as strings.

use std::path::PathBuf;
use thiserror::Error;

/// A single HTTP GET that did not produce a body.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS, TLS, timeout or URL errors raised by the client.
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The response started but the body could not be read in full.
    #[error("reading body failed: {0}")]
    Body(#[source] reqwest::Error),
}

impl FetchError {
    /// True when the failure was the per-request timeout firing.
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Request(e) | FetchError::Body(e) => e.is_timeout(),
            FetchError::Status { .. } => false,
        }
    }
}

/// Structural problems in a feed document.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("document ended inside <{0}>")]
    UnexpectedEof(String),

    #[error("no root element found")]
    NoRoot,

    #[error("junk after document element: <{0}>")]
    MultipleRoots(String),
}

/// Why a single feed was skipped.
#[derive(Debug, Error)]
pub enum FeedLoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] FeedError),
}

/// Problems loading the outlets file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("output directory {path} is not writable: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Dedup cache storage failure.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cannot create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Output sink failure.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("writing {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serializing record failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures that abort a whole ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
