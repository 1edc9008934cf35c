//! Fake 1001tracklists site
//!
//! An axum server on an ephemeral port serving canned HTML by path. Paths can
//! be told to fail with a status a number of times before succeeding, and
//! every request is recorded with its `User-Agent`.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::Html;
use axum::Router;
use collector_common::config::CrawlConfig;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Recorded request
#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub user_agent: Option<String>,
}

#[derive(Default)]
struct SiteState {
    pages: HashMap<String, String>,
    failures: Mutex<HashMap<String, (u16, u32)>>,
    hits: Mutex<Vec<Hit>>,
}

/// Builder and handle for the fake site
#[derive(Default)]
pub struct FakeSite {
    pages: HashMap<String, String>,
    failures: HashMap<String, (u16, u32)>,
}

/// Running fake site
pub struct RunningSite {
    pub addr: SocketAddr,
    state: Arc<SiteState>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` at `path` with 200
    pub fn page(mut self, path: &str, html: impl Into<String>) -> Self {
        self.pages.insert(path.to_string(), html.into());
        self
    }

    /// Answer `path` with `status` for the first `times` requests
    pub fn fail(mut self, path: &str, status: u16, times: u32) -> Self {
        self.failures.insert(path.to_string(), (status, times));
        self
    }

    pub async fn start(self) -> RunningSite {
        let state = Arc::new(SiteState {
            pages: self.pages,
            failures: Mutex::new(self.failures),
            hits: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(serve).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        RunningSite { addr, state }
    }
}

impl RunningSite {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.state.hits.lock().unwrap().clone()
    }

    pub fn hits_for(&self, path: &str) -> usize {
        self.hits().iter().filter(|h| h.path == path).count()
    }
}

async fn serve(
    State(state): State<Arc<SiteState>>,
    uri: Uri,
    headers: HeaderMap,
) -> (StatusCode, Html<String>) {
    let path = uri.path().to_string();
    state.hits.lock().unwrap().push(Hit {
        path: path.clone(),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    if let Some((status, remaining)) = state.failures.lock().unwrap().get_mut(&path) {
        if *remaining > 0 {
            *remaining -= 1;
            return (
                StatusCode::from_u16(*status).unwrap(),
                Html("<html><body>unavailable</body></html>".to_string()),
            );
        }
    }

    match state.pages.get(&path) {
        Some(html) => (StatusCode::OK, Html(html.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Html("<html><body>not found</body></html>".to_string()),
        ),
    }
}

/// Crawl settings pointed at `base_url` with no delays
pub fn crawl_config(base_url: &str) -> CrawlConfig {
    CrawlConfig {
        base_url: base_url.to_string(),
        request_timeout_secs: 5,
        max_retries: 2,
        retry_delay_secs: 0,
        index_delay_min_ms: 0,
        index_delay_max_ms: 0,
        page_delay_min_ms: 0,
        page_delay_max_ms: 0,
        max_empty_pages: 2,
        max_index_pages: 10,
        captcha_pause_secs: 0,
        ..CrawlConfig::default()
    }
}

/// DJ index page listing `hrefs`, half as anchors and half as onclick items
pub fn index_page(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .enumerate()
        .map(|(i, href)| {
            if i % 2 == 0 {
                format!(r#"<div class="bTitle"><a href="{}">set</a></div>"#, href)
            } else {
                format!(
                    r#"<div class="bItm action oItm" onclick="window.open('{}')"></div>"#,
                    href
                )
            }
        })
        .collect();
    format!("<html><body>{}</body></html>", items)
}

/// Tracklist page with one track per `(title, artist)`
pub fn tracklist_page(event: &str, tracks: &[(&str, &str)]) -> String {
    let divs: String = tracks
        .iter()
        .enumerate()
        .map(|(i, (title, artist))| {
            let n = i + 1;
            format!(
                r#"<div id="tlp{n}" data-trno="{n}">
                     <span id="tlp{n}_tracknumber_value">{n:02}</span>
                     <div class="cueValueField">{n}:00</div>
                     <meta itemprop="name" content="{title}">
                     <meta itemprop="byArtist" content="{artist}">
                   </div>"#
            )
        })
        .collect();
    format!(
        r#"<html><head><meta property="og:title" content="{}"></head><body>{}</body></html>"#,
        event, divs
    )
}

pub const CAPTCHA_PAGE: &str =
    r#"<html><body><div class="g-recaptcha" data-sitekey="k"></div></body></html>"#;
