//! Tracklist spider
//!
//! Fetches every collected tracklist page that has not been processed yet,
//! parses it and appends the result to the raw data store. Pages are fetched
//! one at a time with a random 5-10 s gap (configurable). A page that fails
//! is logged and counted, and the run moves on to the next one.
//!
//! When the site answers with a CAPTCHA the spider pauses: on a terminal it
//! waits for Enter, otherwise it sleeps `captcha_pause_secs`. The page is
//! then fetched once more.

use crate::error::{CollectorResult, FetchError};
use crate::parser::TracklistPageParser;
use crate::services::page_client::PageClient;
use crate::store::RawDataStore;
use collector_common::config::CrawlConfig;
use collector_common::Tracklist;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashSet;
use std::io::IsTerminal;
use std::time::Duration;

/// Outcome of one spider run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    /// Pages fetched
    pub attempted: usize,
    /// Tracklists appended to the store
    pub saved: usize,
    /// Parsed, but a tracklist with the same URL was already stored
    pub skipped: usize,
    /// Fetch, parse or store failures
    pub failed: usize,
}

pub struct TracklistSpider {
    client: PageClient,
    parser: TracklistPageParser,
    captcha_pause: Duration,
    interactive: bool,
    show_progress: bool,
}

impl TracklistSpider {
    pub fn new(crawl: &CrawlConfig) -> CollectorResult<Self> {
        Ok(Self {
            client: PageClient::new(crawl, crawl.page_delay_min_ms, crawl.page_delay_max_ms)?,
            parser: TracklistPageParser::new()?,
            captcha_pause: crawl.captcha_pause(),
            interactive: std::io::stdin().is_terminal(),
            show_progress: std::io::stderr().is_terminal(),
        })
    }

    /// Prompt on stdin when a CAPTCHA is hit (default: when stdin is a terminal)
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Draw a progress bar (default: when stderr is a terminal)
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Absolute URLs from the URL file that are not processed yet, in file
    /// order. `None` when no URL file exists.
    pub fn pending_urls(&self, store: &RawDataStore) -> CollectorResult<Option<Vec<String>>> {
        let Some(hrefs) = store.load_urls()? else {
            return Ok(None);
        };
        let processed = store.load_processed()?;

        let mut seen = HashSet::new();
        let pending = hrefs
            .iter()
            .map(|href| self.client.absolute_url(href))
            .filter(|url| !processed.contains(url))
            .filter(|url| seen.insert(url.clone()))
            .collect();
        Ok(Some(pending))
    }

    /// Scrape all pending tracklists
    ///
    /// A page that fails to fetch, parse or store is counted in
    /// `failed` and stays pending. The processed set is written after every
    /// stored page and once more when the run ends.
    pub async fn run(&self, store: &RawDataStore) -> CollectorResult<ScrapeSummary> {
        let Some(pending) = self.pending_urls(store)? else {
            tracing::warn!(path = %store.urls_path().display(), "No URLs file found, run collect-urls first");
            return Ok(ScrapeSummary::default());
        };

        let mut processed = store.load_processed()?;
        tracing::info!(
            already_processed = processed.len(),
            pending = pending.len(),
            "Loaded URLs to parse"
        );

        if pending.is_empty() {
            tracing::info!("No new URLs to process");
            return Ok(ScrapeSummary::default());
        }

        let progress = self.progress_bar(pending.len() as u64);
        let mut summary = ScrapeSummary::default();

        for url in &pending {
            summary.attempted += 1;

            match self.scrape_and_store(url, store, &progress).await {
                Ok(saved) => {
                    if saved {
                        summary.saved += 1;
                    } else {
                        summary.skipped += 1;
                    }
                    processed.insert(url.clone());
                    if let Err(e) = store.save_processed(&processed) {
                        tracing::warn!(url = %url, error = %e, "Failed to save processed URLs");
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(url = %url, error = %e, "Failed to parse tracklist");
                }
            }

            progress.inc(1);
        }

        progress.finish_and_clear();
        store.save_processed(&processed)?;

        tracing::info!(
            attempted = summary.attempted,
            saved = summary.saved,
            skipped = summary.skipped,
            failed = summary.failed,
            "Scrape finished"
        );
        Ok(summary)
    }

    /// Scrape one page and append it to the store; `false` when a tracklist
    /// with the same URL was already stored
    async fn scrape_and_store(
        &self,
        url: &str,
        store: &RawDataStore,
        progress: &ProgressBar,
    ) -> CollectorResult<bool> {
        let tracklist = self.scrape_one(url, progress).await?;
        Ok(store.save_tracklist(&tracklist)?)
    }

    async fn scrape_one(&self, url: &str, progress: &ProgressBar) -> CollectorResult<Tracklist> {
        tracing::info!(url = %url, "Parsing tracklist");

        let html = match self.client.fetch(url).await {
            Err(FetchError::Captcha(_)) => {
                self.wait_for_captcha(url, progress).await;
                self.client.fetch(url).await?
            }
            other => other?,
        };

        let tracklist = self.parser.parse(&html, url)?;
        tracing::info!(
            event = %tracklist.event,
            tracks = tracklist.tracks.len(),
            "Parsed tracklist"
        );
        Ok(tracklist)
    }

    async fn wait_for_captcha(&self, url: &str, progress: &ProgressBar) {
        if self.interactive {
            progress.suspend(|| {
                eprintln!("\nCAPTCHA detected at {}", url);
                eprintln!("Solve it in a browser, then press Enter to continue...");
            });

            let read = tokio::task::spawn_blocking(|| {
                let mut line = String::new();
                std::io::stdin().read_line(&mut line)
            })
            .await;

            match read {
                Ok(Ok(n)) if n > 0 => return,
                _ => tracing::info!("stdin closed, falling back to a timed pause"),
            }
        }

        tracing::warn!(url = %url, pause = ?self.captcha_pause, "CAPTCHA detected, pausing");
        tokio::time::sleep(self.captcha_pause).await;
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if !self.show_progress {
            pb.set_draw_target(ProgressDrawTarget::hidden());
            return pb;
        }
        match ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} (ETA: {eta})")
        {
            Ok(style) => pb.set_style(style.progress_chars("=> ")),
            Err(e) => tracing::debug!(error = %e, "Progress template rejected, using default"),
        }
        pb.set_message("Parsing tracklists");
        pb
    }
}
