use crate::domain::ports::PageFetcher;
use crate::utils::error::{HarvestError, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// `user_agent = "random"` 時輪替使用
const USER_AGENT_POOL: [&str; 4] = [
    DEFAULT_USER_AGENT,
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Resolves the configured user agent; `random` picks one from a fixed pool.
pub fn resolve_user_agent(configured: &str) -> String {
    if configured.eq_ignore_ascii_case("random") {
        USER_AGENT_POOL
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(DEFAULT_USER_AGENT)
            .to_string()
    } else {
        configured.to_string()
    }
}

/// Plain HTTP GET fetcher. Works for server-rendered dealer pages.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(resolve_user_agent(user_agent))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(HarvestError::HttpStatusError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start();
        let page_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/dealers/buy/")
                .query_param("zip", "85001")
                .header("user-agent", "harvest-test");
            then.status(200).body("<html><body>ok</body></html>");
        });

        let fetcher = HttpFetcher::new("harvest-test", Duration::from_secs(5)).unwrap();
        let body = fetcher
            .fetch(&server.url("/dealers/buy/?zip=85001"))
            .await
            .unwrap();

        page_mock.assert();
        assert!(body.contains("ok"));
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/blocked");
            then.status(403);
        });

        let fetcher = HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch(&server.url("/blocked")).await.unwrap_err();

        match err {
            HarvestError::HttpStatusError { status, .. } => assert_eq!(status, 403),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_user_agent() {
        assert_eq!(resolve_user_agent("custom-agent"), "custom-agent");
        let picked = resolve_user_agent("random");
        assert!(USER_AGENT_POOL.contains(&picked.as_str()));
    }
}
