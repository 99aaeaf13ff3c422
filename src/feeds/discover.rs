//! Feed discovery from an outlet homepage.
//!
//! Scans every `href` on the page for `rss`, `feed` or `atom` (any case),
//! resolves the hits against the homepage and returns them sorted and
//! deduplicated. Nothing here validates that a hit is really a feed; the
//! parser copes with whatever comes back.

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::fetch::HttpFetcher;

const FEED_MARKERS: [&str; 3] = ["rss", "feed", "atom"];

static HREF_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("[href]").unwrap());

/// Fetch `homepage` and return candidate feed URLs.
///
/// # Arguments
///
/// * `fetcher` - Client used for the homepage request
/// * `homepage` - Absolute URL of the outlet homepage
///
/// # Returns
///
/// Absolute `http(s)` URLs whose `href` mentions rss, feed or atom, sorted
/// and unique. Fetch failures and unparsable homepages yield an empty list.
#[instrument(level = "info", skip(fetcher))]
pub async fn discover(fetcher: &HttpFetcher, homepage: &str) -> Vec<String> {
    let page = match fetcher.get(homepage).await {
        Ok(page) => page,
        Err(e) => {
            warn!(error = %e, "Homepage fetch failed; no feeds discovered");
            return Vec::new();
        }
    };
    let Ok(base) = Url::parse(homepage) else {
        warn!("Homepage is not an absolute URL; no feeds discovered");
        return Vec::new();
    };

    let feeds = feed_links(&page.text_lossy(), &base);
    info!(count = feeds.len(), "Discovered candidate feeds");
    debug!(feeds = ?feeds, "Candidate feeds");
    feeds
}

/// Feed-looking links in `html`, absolute, sorted and unique.
pub fn feed_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&HREF_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| looks_like_feed(href))
        .filter_map(|href| base.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(String::from)
        .sorted()
        .dedup()
        .collect()
}

fn looks_like_feed(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    FEED_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HOMEPAGE: &str = r#"<html><head>
        <link rel="alternate" type="application/rss+xml" HREF="/news/RSS.xml">
    </head><body>
        <a href="//cdn.example.com/atom.xml">Atom</a>
        <a href="https://other.example/feeds/world">World</a>
        <a href="/news/RSS.xml">Duplicate</a>
        <a href="section/feed">Relative</a>
        <a href="/about">About</a>
        <a href="javascript:openFeed()">Script</a>
        <a href="mailto:rss@example.com">Mail</a>
    </body></html>"#;

    #[test]
    fn test_feed_links_resolves_filters_and_sorts() {
        let base = Url::parse("https://www.example.com/home/").unwrap();
        let links = feed_links(HOMEPAGE, &base);
        assert_eq!(
            links,
            vec![
                "https://cdn.example.com/atom.xml".to_string(),
                "https://other.example/feeds/world".to_string(),
                "https://www.example.com/home/section/feed".to_string(),
                "https://www.example.com/news/RSS.xml".to_string(),
            ]
        );
    }

    #[test]
    fn test_feed_links_empty_page() {
        let base = Url::parse("https://www.example.com").unwrap();
        assert!(feed_links("<html></html>", &base).is_empty());
    }

    #[tokio::test]
    async fn test_discover_fetches_homepage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"<a href="/rss/top.xml">Top</a>"#),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let feeds = discover(&fetcher, &format!("{}/", server.uri())).await;
        assert_eq!(feeds, vec![format!("{}/rss/top.xml", server.uri())]);
    }

    #[tokio::test]
    async fn test_discover_collapses_fetch_failure_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        assert!(discover(&fetcher, &server.uri()).await.is_empty());
    }
}
