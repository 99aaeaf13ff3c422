//! Per-outlet ingestion counts.
//!
//! After each outlet the orchestrator appends one [`IngestMetric`] line to the
//! metrics log. The log is append-only JSONL, like the article output, and is
//! meant for tracking feed health over time rather than for the current run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::instrument;

use super::jsonl::{append_line, to_ascii_line};
use crate::error::SinkError;
use crate::ingest::OutletReport;

/// One metrics row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestMetric {
    /// Start of the run, UTC ISO-8601 with `Z`.
    pub retrieved_at: String,
    pub country: String,
    pub outlet_id: String,
    pub outlet_name: String,
    pub count: usize,
    pub error_count: usize,
    /// First error of the outlet, if any.
    pub error_sample: Option<String>,
}

impl IngestMetric {
    pub fn from_report(report: &OutletReport, retrieved_at: &str) -> Self {
        Self {
            retrieved_at: retrieved_at.to_string(),
            country: report.country.clone(),
            outlet_id: report.outlet_id.clone(),
            outlet_name: report.outlet_name.clone(),
            count: report.count,
            error_count: report.errors.len(),
            error_sample: report.errors.first().cloned(),
        }
    }
}

/// Append-only metrics file.
#[derive(Debug, Clone)]
pub struct MetricsLog {
    path: PathBuf,
}

impl MetricsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    #[instrument(level = "debug", skip_all, fields(outlet = %metric.outlet_id))]
    pub async fn append(&self, metric: &IngestMetric) -> Result<(), SinkError> {
        let line = to_ascii_line(metric)?;
        append_line(&self.path, &line).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(errors: Vec<&str>) -> OutletReport {
        OutletReport {
            country: "Côte d'Ivoire".to_string(),
            outlet_id: "fratmat".to_string(),
            outlet_name: "Fraternité Matin".to_string(),
            count: 3,
            errors: errors.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_from_report_samples_first_error() {
        let metric = IngestMetric::from_report(
            &report(vec!["first failure", "second failure"]),
            "2025-05-06T10:00:00.000000Z",
        );
        assert_eq!(metric.count, 3);
        assert_eq!(metric.error_count, 2);
        assert_eq!(metric.error_sample.as_deref(), Some("first failure"));
        assert_eq!(metric.retrieved_at, "2025-05-06T10:00:00.000000Z");
    }

    #[test]
    fn test_from_report_without_errors() {
        let metric = IngestMetric::from_report(&report(vec![]), "t");
        assert_eq!(metric.error_count, 0);
        assert_eq!(metric.error_sample, None);
    }

    #[tokio::test]
    async fn test_append_creates_parent_and_accumulates() {
        let tmp = tempfile::tempdir().unwrap();
        let log = MetricsLog::new(tmp.path().join("metrics/ingest_counts.jsonl"));

        log.append(&IngestMetric::from_report(&report(vec![]), "t1")).await.unwrap();
        log.append(&IngestMetric::from_report(&report(vec!["boom"]), "t2")).await.unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let rows: Vec<IngestMetric> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].retrieved_at, "t1");
        assert_eq!(rows[1].error_sample.as_deref(), Some("boom"));
        assert_eq!(rows[1].outlet_name, "Fraternité Matin");
        assert!(content.is_ascii());
    }
}
