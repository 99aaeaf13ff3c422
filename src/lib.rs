//! # news_ingest
//!
//! Pulls article metadata from news outlets' RSS and Atom feeds, resolves each
//! item to its full article text, drops anything emitted by an earlier run and
//! appends the rest as JSONL records.
//!
//! ## Pipeline
//!
//! ```text
//! outlets.json ─▶ feeds (configured | discovered) ─▶ parse ─▶ extract ─▶ dedup ─▶ JSONL
//!                                                                  │
//!                                                        seen_urls (SQLite)
//! ```
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`fetch`] | timeout-bounded GET with a fixed user agent |
//! | [`feeds`] | RSS/Atom parsing and homepage feed discovery |
//! | [`extract`] | JSON-LD first, then a main-content heuristic |
//! | [`cache`] | URLs emitted across all runs |
//! | [`outputs`] | record sinks and the metrics log |
//! | [`ingest`] | the orchestrator and [`run_ingestion`] |
//!
//! A run is a single bounded call. Scheduling repeated runs is left to cron
//! or whatever else invokes the binary.

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod feeds;
pub mod fetch;
pub mod ingest;
pub mod models;
pub mod outputs;
pub mod utils;

pub use config::{IngestConfig, OutletsConfig};
pub use error::IngestError;
pub use ingest::{Report, run_ingestion};
