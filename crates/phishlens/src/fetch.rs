//! Page retrieval for content analysis.
//!
//! Certificate validation is disabled on purpose: phishing pages are often
//! served with broken TLS and the page content matters more than transport
//! trust here. Nothing fetched is trusted or executed, only inspected.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{redirect, Client};
use tracing::{debug, warn};
use url::Url;

use crate::config::ExtractorConfig;
use crate::error::{Error, Result};

/// A page that answered, whatever its status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub final_url: String,
    pub status: u16,
    /// Redirect hops followed before the final response.
    pub redirects: usize,
    pub body: String,
}

/// Outcome of one fetch. A failed fetch carries no markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Fetched(FetchedPage),
    Failed(String),
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Fetched(_))
    }

    pub fn page(&self) -> Option<&FetchedPage> {
        match self {
            FetchResult::Fetched(page) => Some(page),
            FetchResult::Failed(_) => None,
        }
    }

    pub fn markup(&self) -> Option<&str> {
        self.page().map(|p| p.body.as_str())
    }
}

/// Something that can retrieve a page.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult;
}

/// HTTP(S) fetcher built on reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    max_redirects: usize,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(true)
            .redirect(redirect::Policy::none())
            .timeout(config.fetch_timeout)
            .build()?;

        Ok(Self {
            client,
            timeout: config.fetch_timeout,
            max_redirects: config.max_redirects,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Follow redirects by hand so the hop count is known.
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage> {
        let mut current = Url::parse(url)?;
        let mut redirects = 0;

        loop {
            let mut response = self.client.get(current.clone()).send().await?;
            let status = response.status();

            if status.is_redirection() {
                if let Some(location) = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                {
                    if redirects >= self.max_redirects {
                        return Err(Error::TooManyRedirects(self.max_redirects));
                    }
                    let next = current.join(location)?;
                    debug!("redirect {status}: {current} -> {next}");
                    current = next;
                    redirects += 1;
                    continue;
                }
            }

            let mut body = Vec::new();
            while let Some(chunk) = response.chunk().await? {
                let room = self.max_body_bytes.saturating_sub(body.len());
                body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                if body.len() >= self.max_body_bytes {
                    debug!("body of {current} truncated at {} bytes", self.max_body_bytes);
                    break;
                }
            }

            return Ok(FetchedPage {
                final_url: current.to_string(),
                status: status.as_u16(),
                redirects,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
    }
}

#[async_trait]
impl ContentSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        let result = match tokio::time::timeout(self.timeout, self.fetch_page(url)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(self.timeout)),
        };

        match result {
            Ok(page) => {
                debug!(
                    "fetched {url}: status {}, {} redirect(s), {} bytes",
                    page.status,
                    page.redirects,
                    page.body.len()
                );
                FetchResult::Fetched(page)
            }
            Err(e) => {
                warn!("fetch of {url} failed: {e}");
                FetchResult::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(timeout_ms: u64) -> HttpFetcher {
        let config = ExtractorConfig {
            fetch_timeout: Duration::from_millis(timeout_ms),
            ..ExtractorConfig::default()
        };
        HttpFetcher::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetches_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hi</html>"))
            .mount(&server)
            .await;

        let result = fetcher(5_000).fetch(&server.uri()).await;
        let page = result.page().expect("fetch should succeed");
        assert_eq!(page.status, 200);
        assert_eq!(page.redirects, 0);
        assert_eq!(page.body, "<html>hi</html>");
    }

    #[tokio::test]
    async fn test_counts_redirects() {
        let server = MockServer::start().await;
        Mock::given(path("/a"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/b"))
            .mount(&server)
            .await;
        Mock::given(path("/b"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/c"))
            .mount(&server)
            .await;
        Mock::given(path("/c"))
            .respond_with(ResponseTemplate::new(200).set_body_string("landed"))
            .mount(&server)
            .await;

        let result = fetcher(5_000).fetch(&format!("{}/a", server.uri())).await;
        let page = result.page().unwrap();
        assert_eq!(page.redirects, 2);
        assert!(page.final_url.ends_with("/c"));
        assert_eq!(page.body, "landed");
    }

    #[tokio::test]
    async fn test_redirect_loop_fails() {
        let server = MockServer::start().await;
        Mock::given(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
            .mount(&server)
            .await;

        let result = fetcher(5_000).fetch(&format!("{}/loop", server.uri())).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_error_status_is_still_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let result = fetcher(5_000).fetch(&server.uri()).await;
        assert_eq!(result.page().unwrap().status, 404);
        assert_eq!(result.markup(), Some("not here"));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let result = fetcher(200).fetch(&server.uri()).await;
        assert!(!result.is_success());
        assert_eq!(result.markup(), None);
    }

    #[tokio::test]
    async fn test_unreachable_and_invalid_urls_fail() {
        let f = fetcher(2_000);
        assert!(!f.fetch("http://127.0.0.1:1/").await.is_success());
        assert!(!f.fetch("http://exa mple.com/").await.is_success());
    }

    #[tokio::test]
    async fn test_body_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
            .mount(&server)
            .await;

        let config = ExtractorConfig {
            max_body_bytes: 1000,
            ..ExtractorConfig::default()
        };
        let result = HttpFetcher::new(&config).unwrap().fetch(&server.uri()).await;
        assert_eq!(result.markup().unwrap().len(), 1000);
    }
}
