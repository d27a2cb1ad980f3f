//! Network module for fetching the pages of a thread.
//!
//! Pages are requested one after another over a single HTTP session, with a
//! randomized pause between requests. The first page decides how many pages
//! the thread has.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ScrapeConfig;
use crate::parser::{detect_total_pages, has_post_listing};

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid header value for {name}")]
    InvalidHeader { name: &'static str },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP error {status}: {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// One retrieved page of a thread.
#[derive(Clone, Debug)]
pub struct Page {
    /// 1-based page number
    pub number: u32,
    pub url: String,
    pub html: String,
    pub fetched_at: DateTime<Utc>,
}

impl AsRef<str> for Page {
    fn as_ref(&self) -> &str {
        &self.html
    }
}

/// URL of page `number` of a thread.
///
/// Page 1 is the thread URL itself; page `n` lives at `<thread_url>/<n - 1>`.
pub fn page_url(thread_url: &str, number: u32) -> String {
    if number <= 1 {
        thread_url.to_string()
    } else {
        format!("{}/{}", thread_url.trim_end_matches('/'), number - 1)
    }
}

/// Fetches thread pages over one cookie-keeping HTTP session.
pub struct PageFetcher {
    client: reqwest::Client,
    config: ScrapeConfig,
}

impl PageFetcher {
    /// Build the HTTP session described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a header value is invalid or the client cannot be built.
    pub fn new(config: &ScrapeConfig) -> Result<Self, NetworkError> {
        let mut headers = HeaderMap::new();
        let accept_language = HeaderValue::from_str(&config.accept_language).map_err(|_| {
            NetworkError::InvalidHeader {
                name: "Accept-Language",
            }
        })?;
        headers.insert(ACCEPT_LANGUAGE, accept_language);

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(NetworkError::Client)?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Fetch a single page by number.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn fetch_page(&self, number: u32) -> Result<Page, NetworkError> {
        let url = page_url(&self.config.thread_url, number);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| NetworkError::Request {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(NetworkError::Status {
                url,
                status: response.status(),
            });
        }

        let html = response.text().await.map_err(|source| NetworkError::Request {
            url: url.clone(),
            source,
        })?;

        if !has_post_listing(&html) {
            warn!(page = number, url = %url, "Page has no post listing");
        }

        Ok(Page {
            number,
            url,
            html,
            fetched_at: Utc::now(),
        })
    }

    /// Fetch every page of the thread, in order.
    ///
    /// The page count is detected from the first page and capped by
    /// `max_pages` when set.
    ///
    /// # Errors
    ///
    /// Returns the first page retrieval error; retrieval failures abort the run.
    pub async fn fetch_thread(&self) -> Result<Vec<Page>, NetworkError> {
        info!(url = %self.config.thread_url, "Opening page 1");
        let first = self.fetch_page(1).await?;

        let detected = detect_total_pages(&first.html, &self.config.thread_url);
        let total = self.config.max_pages.map_or(detected, |max| max.min(detected));
        info!(detected, total, "Detected thread pages");

        let mut pages = Vec::with_capacity(total as usize);
        pages.push(first);

        for number in 2..=total {
            tokio::time::sleep(self.pacing_delay()).await;
            info!(page = number, total, "Fetching page");
            pages.push(self.fetch_page(number).await?);
        }

        Ok(pages)
    }

    fn pacing_delay(&self) -> Duration {
        let jitter_ms = u64::try_from(self.config.jitter.as_millis()).unwrap_or(u64::MAX);
        let extra = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.config.base_delay + Duration::from_millis(extra)
    }
}
