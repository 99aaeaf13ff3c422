//! Full article text for a feed item.
//!
//! Given an article URL, the page is fetched once and run through a strategy
//! chain; the first strategy to produce text wins:
//!
//! 1. [`jsonld`]: `articleBody` values from embedded JSON-LD. Preferred since
//!    it is publisher-structured and free of page chrome.
//! 2. [`heuristic`]: main-content extraction over the static DOM, accepted only
//!    if it passes [`looks_like_structured_payload`].
//!
//! Extraction never fails outright. Every path ends in an [`ExtractOutcome`];
//! callers that only care about the text use [`ExtractOutcome::into_text`].

pub mod heuristic;
pub mod jsonld;

use scraper::Html;
use std::fmt;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::fetch::HttpFetcher;

pub use heuristic::looks_like_structured_payload;

/// Which strategy produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMethod {
    JsonLd,
    Heuristic,
}

/// Result of trying to extract one article.
///
/// Only `Extracted` carries text. `NoContent` is the expected miss; the other
/// variants keep the diagnostic for logging.
#[derive(Debug)]
pub enum ExtractOutcome {
    Extracted { text: String, method: ExtractMethod },
    /// Page fetched but neither strategy found article text.
    NoContent,
    /// Heuristic output looked like markup, JSON-LD or CSS.
    Rejected,
    /// The HTML itself could not be retrieved.
    FetchFailed(FetchError),
}

impl ExtractOutcome {
    pub fn into_text(self) -> Option<String> {
        match self {
            ExtractOutcome::Extracted { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self, ExtractOutcome::Extracted { .. })
    }
}

impl fmt::Display for ExtractOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractOutcome::Extracted { text, method } => {
                write!(f, "extracted {} chars via {:?}", text.chars().count(), method)
            }
            ExtractOutcome::NoContent => f.write_str("no article content"),
            ExtractOutcome::Rejected => f.write_str("rejected non-article payload"),
            ExtractOutcome::FetchFailed(e) => write!(f, "fetch failed: {e}"),
        }
    }
}

/// Fetch `url` and extract its article text.
///
/// # Arguments
///
/// * `fetcher` - Client used for the article request
/// * `url` - Article page to fetch
///
/// # Returns
///
/// [`ExtractOutcome::Extracted`] with the text and the strategy that found
/// it; every failure is one of the other variants, never an error.
#[instrument(level = "debug", skip(fetcher), fields(%url))]
pub async fn extract(fetcher: &HttpFetcher, url: &str) -> ExtractOutcome {
    match fetcher.get(url).await {
        Ok(page) => extract_from_html(&page.text_lossy()),
        Err(e) => ExtractOutcome::FetchFailed(e),
    }
}

/// Run the strategy chain over already-fetched HTML.
pub fn extract_from_html(html: &str) -> ExtractOutcome {
    let document = Html::parse_document(html);

    if let Some(text) = jsonld::article_body(&document) {
        debug!(chars = text.len(), "Article body from JSON-LD");
        return ExtractOutcome::Extracted {
            text,
            method: ExtractMethod::JsonLd,
        };
    }

    match heuristic::main_text(&document) {
        None => ExtractOutcome::NoContent,
        Some(text) if looks_like_structured_payload(&text) => ExtractOutcome::Rejected,
        Some(text) => ExtractOutcome::Extracted {
            text,
            method: ExtractMethod::Heuristic,
        },
    }
}
