// src/feed.rs
//! REST client for the financial news feed, behind the [`ArticleSource`]
//! seam so the poll loop can be driven by mocks in tests.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::article::Article;

/// Window-based article source consumed by the poll loop.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch articles with `start_ms <= published_at < end_ms`, in the order
    /// the backend delivers them. An absent `start_ms` means "since the
    /// beginning". Errors are the caller's to swallow.
    async fn fetch_window(
        &self,
        start_ms: Option<i64>,
        end_ms: i64,
        limit: usize,
    ) -> Result<Vec<Article>>;

    fn name(&self) -> &'static str;
}

pub struct NewsFeedClient {
    base_url: String,
    client: reqwest::Client,
}

impl NewsFeedClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("building http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

/// The backend has shipped three response envelopes over time; accept all.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NewsResponse {
    Wrapped { data: Vec<Article> },
    Named { articles: Vec<Article> },
    Bare(Vec<Article>),
}

impl NewsResponse {
    fn into_articles(self) -> Vec<Article> {
        match self {
            NewsResponse::Wrapped { data } => data,
            NewsResponse::Named { articles } => articles,
            NewsResponse::Bare(list) => list,
        }
    }
}

#[async_trait]
impl ArticleSource for NewsFeedClient {
    async fn fetch_window(
        &self,
        start_ms: Option<i64>,
        end_ms: i64,
        limit: usize,
    ) -> Result<Vec<Article>> {
        let url = format!("{}/news", self.base_url);
        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if let Some(start) = start_ms {
            query.push(("start", start.to_string()));
        }
        query.push(("end", end_ms.to_string()));

        debug!(%url, ?start_ms, end_ms, limit, "fetching news window");

        let body: NewsResponse = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .context("news request")?
            .error_for_status()
            .context("news non-2xx")?
            .json()
            .await
            .context("decoding news response")?;

        Ok(body.into_articles())
    }

    fn name(&self) -> &'static str {
        "news-api"
    }
}
