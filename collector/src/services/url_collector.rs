//! Tracklist URL collector
//!
//! Walks the DJ index pages (`index.html`, `index2.html`, ...) and gathers
//! every tracklist href. The walk ends after `max_empty_pages` consecutive
//! pages that add nothing new, or at `max_index_pages`.

use crate::error::CollectorResult;
use crate::parser::IndexPageParser;
use crate::services::page_client::{absolute_url, PageClient};
use crate::store::{parse_tracklists, RawDataStore};
use collector_common::config::CrawlConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

static TRACKLIST_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/tracklist/[^/]+/eric-prydz-(.+)-(\d{4}-\d{2}-\d{2})\.html")
        .expect("valid tracklist URL pattern")
});

/// Outcome of one collector run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectSummary {
    pub pages_visited: u32,
    /// Hrefs found during this run
    pub collected: BTreeSet<String>,
    /// Collected hrefs with no stored tracklist yet
    pub new: BTreeSet<String>,
    /// Collected hrefs already stored as tracklists
    pub already_parsed: usize,
    /// Size of the URL file after merging
    pub total_saved: usize,
}

pub struct UrlCollector {
    client: PageClient,
    parser: IndexPageParser,
    index_path: String,
    max_empty_pages: u32,
    max_index_pages: u32,
}

impl UrlCollector {
    pub fn new(crawl: &CrawlConfig) -> CollectorResult<Self> {
        Ok(Self {
            client: PageClient::new(crawl, crawl.index_delay_min_ms, crawl.index_delay_max_ms)?,
            parser: IndexPageParser::new()?,
            index_path: crawl.dj_index_path.clone(),
            max_empty_pages: crawl.max_empty_pages.max(1),
            max_index_pages: crawl.max_index_pages,
        })
    }

    /// Absolute URL of index page `page` (1-based)
    pub fn index_page_url(&self, page: u32) -> String {
        self.client.absolute_url(&index_page_path(&self.index_path, page))
    }

    /// Walk the index pages and return every distinct tracklist href
    pub async fn collect(&self) -> (BTreeSet<String>, u32) {
        let mut urls = BTreeSet::new();
        let mut misses = 0;
        let mut page = 1;

        while misses < self.max_empty_pages && page <= self.max_index_pages {
            let url = self.index_page_url(page);

            match self.client.fetch(&url).await {
                Ok(html) => {
                    let links = self.parser.extract_links(&html);
                    let before = urls.len();
                    urls.extend(links.iter().cloned());
                    let added = urls.len() - before;

                    if added > 0 {
                        misses = 0;
                        tracing::info!(page, found = links.len(), added, total = urls.len(), "Index page collected");
                    } else {
                        misses += 1;
                        tracing::info!(page, misses, "No new URLs on index page");
                    }
                }
                Err(e) => {
                    misses += 1;
                    tracing::warn!(page, url = %url, misses, error = %e, "Index page fetch failed");
                }
            }

            page += 1;
        }

        let visited = page - 1;
        tracing::info!(pages = visited, total = urls.len(), "Finished collecting URLs");
        (urls, visited)
    }

    /// Collect, compare against stored tracklists, and merge into the URL file
    pub async fn run(&self, store: &RawDataStore) -> CollectorResult<CollectSummary> {
        let (collected, pages_visited) = self.collect().await;

        let (new, existing) = compare_urls(&collected, self.client.base_url(), &store.tracklists_path());
        let already_parsed = collected.len() - new.len();
        tracing::debug!(stored_tracklists = existing.len(), "Compared against tracklists file");

        let total_saved = store.save_urls(&collected)?;
        tracing::info!(
            total = total_saved,
            path = %store.urls_path().display(),
            "Saved URL file"
        );

        Ok(CollectSummary {
            pages_visited,
            collected,
            new,
            already_parsed,
            total_saved,
        })
    }
}

/// Path of index page `page`: `index.html` for the first, `indexN.html` after
pub fn index_page_path(first_page_path: &str, page: u32) -> String {
    if page <= 1 {
        return first_page_path.to_string();
    }
    match first_page_path.strip_suffix("index.html") {
        Some(prefix) => format!("{}index{}.html", prefix, page),
        None => {
            let sep = if first_page_path.contains('?') { '&' } else { '?' };
            format!("{}{}page={}", first_page_path, sep, page)
        }
    }
}

/// Split collected hrefs into (new, existing) against the tracklists file
///
/// `existing` holds the URLs of all stored tracklists. The file is read
/// leniently: missing or unreadable counts as empty.
pub fn compare_urls(
    collected: &BTreeSet<String>,
    base_url: &str,
    tracklists_file: &Path,
) -> (BTreeSet<String>, BTreeSet<String>) {
    let existing = read_stored_urls(tracklists_file);

    let new: BTreeSet<String> = collected
        .iter()
        .filter(|href| !existing.contains(&absolute_url(base_url, href)))
        .cloned()
        .collect();

    if new.is_empty() {
        tracing::info!("No new tracklists found");
    } else {
        tracing::info!(count = new.len(), "Found new tracklists");
        for href in &new {
            match describe_url(href) {
                Some((date, venue)) => tracing::info!("- {}: {}", date, venue),
                None => tracing::info!("- {}", href),
            }
        }
    }

    tracing::info!(
        collected = collected.len(),
        new = new.len(),
        already_parsed = collected.len() - new.len(),
        "URL summary"
    );

    (new, existing)
}

fn read_stored_urls(tracklists_file: &Path) -> BTreeSet<String> {
    if !tracklists_file.exists() {
        return BTreeSet::new();
    }

    let parsed = std::fs::read_to_string(tracklists_file)
        .map_err(|e| e.to_string())
        .and_then(|content| parse_tracklists(&content).map_err(|e| e.to_string()));

    match parsed {
        Ok(tracklists) => tracklists.into_iter().map(|t| t.url).collect(),
        Err(e) => {
            tracing::warn!(
                path = %tracklists_file.display(),
                error = %e,
                "Error reading tracklists file, proceeding with no existing tracklists"
            );
            BTreeSet::new()
        }
    }
}

/// `(date, Venue Title)` for URLs shaped like
/// `/tracklist/<id>/eric-prydz-<venue>-<YYYY-MM-DD>.html`
pub fn describe_url(url: &str) -> Option<(String, String)> {
    let caps = TRACKLIST_URL_PATTERN.captures(url)?;
    let venue = caps[1]
        .split('-')
        .filter(|w| !w.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");
    Some((caps[2].to_string(), venue))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
