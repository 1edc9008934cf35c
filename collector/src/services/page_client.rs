//! HTTP page client for 1001tracklists
//!
//! Sequential, rate-limited HTML fetching. Each request looks like a desktop
//! browser navigation: a `User-Agent` drawn from a small pool and the usual
//! `Accept`/`Sec-Fetch-*` headers. Transient failures are retried a bounded
//! number of times; CAPTCHA interstitials are surfaced as
//! [`FetchError::Captcha`] so the caller can decide how to wait.

use crate::error::{CollectorResult, FetchError};
use crate::parser::CaptchaDetector;
use collector_common::config::CrawlConfig;
use collector_common::time::jittered;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Desktop browser identities rotated per request
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Rate limiter with a randomized minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval_ms: u64,
    max_interval_ms: u64,
}

impl RateLimiter {
    fn new(min_interval_ms: u64, max_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval_ms,
            max_interval_ms,
        }
    }

    /// Wait if necessary so consecutive requests are spaced by a fresh
    /// random interval from the window
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let interval = jittered(self.min_interval_ms, self.max_interval_ms);
            let elapsed = last_time.elapsed();
            if elapsed < interval {
                let wait_time = interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Rate-limited HTML page client
pub struct PageClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    captcha: CaptchaDetector,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
    retry_status_codes: Vec<u16>,
}

impl PageClient {
    /// Client spacing requests by a random delay in `[min_delay_ms, max_delay_ms]`
    pub fn new(crawl: &CrawlConfig, min_delay_ms: u64, max_delay_ms: u64) -> CollectorResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(crawl.request_timeout())
            .default_headers(browser_headers())
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(min_delay_ms, max_delay_ms)),
            captcha: CaptchaDetector::new()?,
            base_url: crawl.base_url.trim_end_matches('/').to_string(),
            max_retries: crawl.max_retries.max(1),
            retry_delay: crawl.retry_delay(),
            retry_status_codes: crawl.retry_status_codes.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a site-relative href
    pub fn absolute_url(&self, href: &str) -> String {
        absolute_url(&self.base_url, href)
    }

    /// Fetch a page, retrying network errors and retryable statuses
    ///
    /// Returns [`FetchError::Captcha`] without retrying when the body is a
    /// CAPTCHA challenge.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => {
                    if self.captcha.is_captcha(&body) {
                        tracing::warn!(url = %url, "CAPTCHA detected");
                        return Err(FetchError::Captcha(url.to_string()));
                    }
                    return Ok(body);
                }
                Err(e) if e.is_retryable(&self.retry_status_codes) => {
                    if attempt >= self.max_retries {
                        tracing::error!(url = %url, attempts = attempt, error = %e, "All retries failed");
                        return Err(FetchError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            last: e.to_string(),
                        });
                    }
                    tracing::warn!(
                        url = %url,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Fetch failed, retrying in {:?}",
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        self.rate_limiter.wait().await;

        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        tracing::debug!(url = %url, "Fetching page");

        let response = self
            .http_client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16(), url.to_string()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

/// Join a site-relative href onto `base_url`; absolute URLs pass through
pub fn absolute_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{}{}", base, href)
    } else {
        format!("{}/{}", base, href)
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers
}
