//! Where ingested records go.
//!
//! The orchestrator writes through the [`RecordSink`] trait so the storage
//! backend can change without touching the pipeline.
//!
//! # Submodules
//!
//! - [`jsonl`]: append-only JSONL files, one per outlet, grouped by country
//! - [`metrics`]: one JSONL row per outlet per run with emitted/error counts
//!
//! # Output Structure
//!
//! ```text
//! out_dir/
//! ├── United-Kingdom/
//! │   ├── bbc.jsonl
//! │   └── guardian.jsonl
//! └── Ireland/
//!     └── rte.jsonl
//!
//! data/metrics/
//! └── ingest_counts.jsonl
//! ```

pub mod jsonl;
pub mod metrics;

use crate::error::SinkError;
use crate::models::ArticleRecord;

pub use jsonl::JsonlSink;
pub use metrics::{IngestMetric, MetricsLog};

/// Destination for normalized article records.
///
/// Implementations must never rewrite or drop a record once `append` has
/// returned `Ok`.
pub trait RecordSink {
    /// Persist one record.
    async fn append(&mut self, record: &ArticleRecord) -> Result<(), SinkError>;

    /// Human-readable location, used in the run summary.
    fn destination(&self) -> String;
}

/// Keeps records in memory, in append order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<ArticleRecord>,
}

impl RecordSink for MemorySink {
    async fn append(&mut self, record: &ArticleRecord) -> Result<(), SinkError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn destination(&self) -> String {
        "memory".to_string()
    }
}
