// src/fetch.rs
//! Raw page retrieval. The pipeline never inspects transport details:
//! an empty string is the sole failure signal and maps to "no fragment
//! produced" for that source.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`; empty string on any failure.
    async fn fetch(&self, url: &str) -> String;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("afisha-bot/0.1 (+github.com/afisha-bot)")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> String {
        let resp = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, url, "fetch failed");
                return String::new();
            }
        };
        if let Err(e) = resp.error_for_status_ref() {
            warn!(error = %e, url, "fetch returned error status");
            return String::new();
        }
        resp.text().await.unwrap_or_default()
    }
}

/// Canned pages keyed by URL; for tests and dry runs.
#[derive(Default)]
pub struct FixtureFetcher {
    pages: HashMap<String, String>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> String {
        self.pages.get(url).cloned().unwrap_or_default()
    }
}
