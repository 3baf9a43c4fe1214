// src/crawl/fetch.rs
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};

use crate::crawl::types::{CrawlError, RawResponse};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36 Edg/136.0.0.0";
pub const REQUEST_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// One request attempt, whole body buffered. Only transport errors fail here.
    async fn send(&self, url: &str) -> Result<RawResponse, CrawlError>;

    /// `send` followed by the HTTP 200 check.
    async fn fetch(&self, url: &str) -> Result<RawResponse, CrawlError> {
        self.send(url).await?.ensure_success(url)
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(ua: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: ua.to_string(),
        }
    }

    /// Honors `CRAWLER_USER_AGENT` when set and non-blank.
    pub fn from_env() -> Self {
        match std::env::var("CRAWLER_USER_AGENT") {
            Ok(ua) if !ua.trim().is_empty() => Self::with_user_agent(ua.trim()),
            _ => Self::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn send(&self, url: &str) -> Result<RawResponse, CrawlError> {
        let transport = |e: reqwest::Error| CrawlError::Transport {
            url: url.to_string(),
            cause: e.to_string(),
        };

        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(CONTENT_TYPE, REQUEST_CONTENT_TYPE)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await.map_err(transport)?.to_vec();

        tracing::debug!(url, status, bytes = body.len(), "source responded");
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

// --- Test helper ---
/// Serves canned responses by exact URL; unknown URLs fail as transport errors.
pub struct StubFetcher {
    routes: HashMap<String, RawResponse>,
    pub calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn route(mut self, url: &str, resp: RawResponse) -> Self {
        self.routes.insert(url.to_string(), resp);
        self
    }
}

impl Default for StubFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn send(&self, url: &str) -> Result<RawResponse, CrawlError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }
        self.routes
            .get(url)
            .cloned()
            .ok_or_else(|| CrawlError::Transport {
                url: url.to_string(),
                cause: "connection refused".to_string(),
            })
    }
}
