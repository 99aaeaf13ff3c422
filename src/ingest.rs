//! Ingestion orchestrator.
//!
//! Walks outlets, then feeds, then items, in configuration and document order:
//!
//! 1. **Feeds**: the outlet's configured list, else homepage discovery when
//!    enabled, else one `No feeds found for ...` error
//! 2. **Parse**: fetch and parse each feed; a failure is recorded and only that
//!    feed is skipped
//! 3. **Extract**: fetch each article and run the extraction chain; items
//!    without text are skipped silently
//! 4. **Emit**: skip empty URLs and URLs already seen this run or in the cache,
//!    otherwise append the record and mark the URL seen
//! 5. **Commit**: the dedup cache is committed once per outlet
//!
//! Feed and item problems end up as strings in the [`Report`]. Only cache and
//! sink failures abort the run, since past that point duplicates could no
//! longer be ruled out.
//!
//! Extraction of one feed's items may run `article_concurrency` fetches at
//! once. Results are still consumed in document order and the
//! check-then-write step for each URL runs one at a time.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::fmt;
use std::pin::pin;
use tracing::{debug, info, instrument, warn};

use crate::cache::SeenCache;
use crate::config::IngestConfig;
use crate::error::{FeedLoadError, IngestError};
use crate::extract::{ExtractOutcome, extract};
use crate::feeds;
use crate::fetch::HttpFetcher;
use crate::models::{ArticleRecord, FeedItem, Outlet};
use crate::outputs::{IngestMetric, JsonlSink, MetricsLog, RecordSink};
use crate::utils::utc_now_iso;

/// Outcome for one outlet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutletReport {
    pub country: String,
    pub outlet_id: String,
    pub outlet_name: String,
    /// Records emitted.
    pub count: usize,
    pub errors: Vec<String>,
}

impl OutletReport {
    fn for_outlet(outlet: &Outlet) -> Self {
        Self {
            country: outlet.country.clone(),
            outlet_id: outlet.id.clone(),
            outlet_name: outlet.name.clone(),
            ..Default::default()
        }
    }
}

/// Aggregated outcome of a run.
///
/// `Display` renders the summary line followed, when there were errors, by
/// an `Errors:` listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub destination: String,
    pub outlets: Vec<OutletReport>,
}

impl Report {
    pub fn total(&self) -> usize {
        self.outlets.iter().map(|o| o.count).sum()
    }

    /// Every error string, in outlet order.
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.outlets
            .iter()
            .flat_map(|o| o.errors.iter().map(String::as_str))
    }

    pub fn has_errors(&self) -> bool {
        self.outlets.iter().any(|o| !o.errors.is_empty())
    }

    pub fn summary_line(&self) -> String {
        format!("Ingested {} articles into {}", self.total(), self.destination)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary_line())?;
        if self.has_errors() {
            write!(f, "\nErrors:")?;
            for error in self.errors() {
                write!(f, "\n - {error}")?;
            }
        }
        Ok(())
    }
}

/// Drives one run over a fetcher, a dedup cache and a record sink.
pub struct Ingestor<S: RecordSink> {
    fetcher: HttpFetcher,
    cache: SeenCache,
    sink: S,
    metrics: Option<MetricsLog>,
    discover: bool,
    article_concurrency: usize,
    seen_this_run: HashSet<String>,
    run_started: String,
}

impl<S: RecordSink> Ingestor<S> {
    pub fn new(fetcher: HttpFetcher, cache: SeenCache, sink: S) -> Self {
        Self {
            fetcher,
            cache,
            sink,
            metrics: None,
            discover: false,
            article_concurrency: 1,
            seen_this_run: HashSet::new(),
            run_started: utc_now_iso(),
        }
    }

    /// Fall back to homepage discovery for outlets without feeds.
    pub fn with_discovery(mut self, discover: bool) -> Self {
        self.discover = discover;
        self
    }

    pub fn with_metrics(mut self, metrics: Option<MetricsLog>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Article fetches in flight per feed; `0` is treated as `1`.
    pub fn with_article_concurrency(mut self, limit: usize) -> Self {
        self.article_concurrency = limit.max(1);
        self
    }

    /// Records written so far live here; after a failed run this is what
    /// reached the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Ingest every outlet in order.
    #[instrument(level = "info", skip_all, fields(outlets = outlets.len()))]
    pub async fn run(&mut self, outlets: &[Outlet]) -> Result<Report, IngestError> {
        let mut report = Report {
            destination: self.sink.destination(),
            outlets: Vec::with_capacity(outlets.len()),
        };
        for outlet in outlets {
            let outlet_report = self.ingest_outlet(outlet).await?;
            if let Some(metrics) = &self.metrics {
                let metric = IngestMetric::from_report(&outlet_report, &self.run_started);
                metrics.append(&metric).await?;
            }
            report.outlets.push(outlet_report);
        }
        info!(
            total = report.total(),
            errors = report.errors().count(),
            "Ingestion run finished"
        );
        Ok(report)
    }

    /// Close the cache and hand back the sink.
    pub async fn finish(self) -> S {
        self.cache.close().await;
        self.sink
    }

    #[instrument(level = "info", skip_all, fields(outlet = %outlet.id, country = %outlet.country))]
    async fn ingest_outlet(&mut self, outlet: &Outlet) -> Result<OutletReport, IngestError> {
        let mut report = OutletReport::for_outlet(outlet);

        let feed_urls = self.resolve_feeds(outlet).await;
        if feed_urls.is_empty() {
            warn!("No feeds configured or discovered");
            report.errors.push(format!("No feeds found for {}", outlet.name));
            return Ok(report);
        }

        for feed_url in &feed_urls {
            let items = match self.load_feed(feed_url).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(%feed_url, error = %e, "Skipping feed");
                    report
                        .errors
                        .push(format!("{} feed error: {} -> {}", outlet.name, feed_url, e));
                    continue;
                }
            };
            report.count += self.ingest_items(outlet, feed_url, items).await?;
        }

        let committed = self.cache.commit().await?;
        info!(
            count = report.count,
            errors = report.errors.len(),
            committed,
            "Outlet done"
        );
        Ok(report)
    }

    async fn resolve_feeds(&self, outlet: &Outlet) -> Vec<String> {
        if !outlet.feeds.is_empty() {
            return outlet.feeds.clone();
        }
        if !self.discover {
            return Vec::new();
        }
        if outlet.homepage.is_empty() {
            debug!("No homepage to discover feeds from");
            return Vec::new();
        }
        feeds::discover(&self.fetcher, &outlet.homepage).await
    }

    async fn load_feed(&self, feed_url: &str) -> Result<Vec<FeedItem>, FeedLoadError> {
        let body = self.fetcher.get(feed_url).await?;
        Ok(feeds::parse(&body.bytes)?)
    }

    /// Extract and emit one feed's items. Returns the number emitted.
    #[instrument(level = "debug", skip_all, fields(%feed_url, items = items.len()))]
    async fn ingest_items(
        &mut self,
        outlet: &Outlet,
        feed_url: &str,
        items: Vec<FeedItem>,
    ) -> Result<usize, IngestError> {
        // Items already known are not worth a page fetch. The check is repeated
        // before writing since earlier items of this feed may claim a URL.
        let mut candidates = Vec::with_capacity(items.len());
        for item in items {
            let url = item.record_url();
            if url.is_empty() {
                debug!("Skipping item without URL");
            } else if self.seen_this_run.contains(url) || self.cache.is_seen(url).await? {
                debug!(%url, "Already seen");
            } else {
                candidates.push(item);
            }
        }

        let fetcher = &self.fetcher;
        let outcomes = stream::iter(candidates)
            .map(|item| async move {
                let outcome = extract(fetcher, item.record_url()).await;
                (item, outcome)
            })
            .buffered(self.article_concurrency);
        let mut outcomes = pin!(outcomes);

        let mut emitted = 0;
        while let Some((item, outcome)) = outcomes.next().await {
            let full_text = match outcome {
                ExtractOutcome::Extracted { text, method } => {
                    debug!(url = %item.record_url(), ?method, "Extracted article");
                    text
                }
                other => {
                    debug!(url = %item.record_url(), outcome = %other, "No article text");
                    continue;
                }
            };

            let record = ArticleRecord::from_item(&item, outlet, feed_url, Some(full_text));
            if self.seen_this_run.contains(&record.url) || self.cache.is_seen(&record.url).await? {
                debug!(url = %record.url, "Duplicate within run");
                continue;
            }

            self.sink.append(&record).await?;
            self.cache.mark_seen(&record.url);
            self.seen_this_run.insert(record.url);
            emitted += 1;
        }
        Ok(emitted)
    }
}

/// Run one ingestion pass as described by `config`, writing JSONL output.
///
/// Opens the dedup cache, visits every outlet in order and closes the cache
/// again, also when the run aborts.
///
/// # Arguments
///
/// * `config` - Outlets, output and cache locations, and fetch settings
///
/// # Returns
///
/// The run [`Report`]. Feed-level and outlet-level problems are listed in it
/// rather than returned as errors.
///
/// # Errors
///
/// [`IngestError`] if the HTTP client cannot be built, the cache cannot be
/// opened or written, or a record or metrics row cannot be appended.
#[instrument(level = "info", skip_all, fields(out = %config.out_dir.display()))]
pub async fn run_ingestion(config: &IngestConfig) -> Result<Report, IngestError> {
    let fetcher = HttpFetcher::new(&config.fetch).map_err(IngestError::Client)?;
    let cache = SeenCache::open(&config.cache_path).await?;
    let sink = JsonlSink::new(&config.out_dir);

    let mut ingestor = Ingestor::new(fetcher, cache, sink)
        .with_discovery(config.discover)
        .with_metrics(config.metrics_path.clone().map(MetricsLog::new))
        .with_article_concurrency(config.article_concurrency);

    let result = ingestor.run(&config.outlets).await;
    ingestor.finish().await;
    result
}
