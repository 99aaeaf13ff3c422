//! Timeout-bounded HTTP GET with a fixed user agent.
//!
//! Every failure (network, timeout, non-2xx status, truncated body) maps to a
//! [`FetchError`]. There is no retry: a failed fetch is final for its caller
//! within the current run.

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::FetchConfig;
use crate::error::FetchError;

/// A fetched response body.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    /// `Content-Type` header, empty when the server sent none.
    pub content_type: String,
}

impl Fetched {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Shared HTTP client for one run.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            timeout: config.timeout,
        })
    }

    /// GET `url` with the run's default timeout.
    pub async fn get(&self, url: &str) -> Result<Fetched, FetchError> {
        self.fetch(url, self.timeout).await
    }

    /// GET `url`, giving up after `timeout`.
    #[instrument(level = "debug", skip(self, timeout), fields(%url))]
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<Fetched, FetchError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .timeout(timeout)
            .send()
            .await
            .map_err(FetchError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = response.bytes().await.map_err(FetchError::Body)?.to_vec();

        debug!(bytes = bytes.len(), %content_type, "Fetched");
        Ok(Fetched {
            bytes,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&FetchConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .and(header("user-agent", "BasedNewsBot/0.1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<rss/>", "application/rss+xml"),
            )
            .mount(&server)
            .await;

        let fetched = fetcher().get(&format!("{}/rss", server.uri())).await.unwrap();
        assert_eq!(fetched.bytes, b"<rss/>");
        assert_eq!(fetched.content_type, "application/rss+xml");
        assert_eq!(fetched.text_lossy(), "<rss/>");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher()
            .get(&format!("{}/gone", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/slow", server.uri()), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err}");
    }

    #[tokio::test]
    async fn test_fetch_invalid_url_is_request_error() {
        let err = fetcher().get("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::Request(_)));
    }
}
