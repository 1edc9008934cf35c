//! Raw data store
//!
//! JSON files under the raw data directory:
//!
//! | file | content |
//! |------|---------|
//! | `tracklist_urls.json` | relative tracklist hrefs from the index pages |
//! | `processed_urls.json` | absolute URLs already parsed |
//! | `tracklists.json` | parsed [`Tracklist`] records |
//! | `scrape_state.json` | [`ScrapeState`] run summary |
//!
//! Every write goes through a temp file and a rename, so an interrupted run
//! never leaves a truncated file behind.

use chrono::{DateTime, Utc};
use collector_common::time;
use collector_common::{Error, Result, Tracklist};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const URLS_FILE: &str = "tracklist_urls.json";
pub const PROCESSED_FILE: &str = "processed_urls.json";
pub const TRACKLISTS_FILE: &str = "tracklists.json";
pub const STATE_FILE: &str = "scrape_state.json";

/// Run summary kept in `scrape_state.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeState {
    #[serde(default, with = "collector_common::time::lenient_timestamp")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scraped_urls: BTreeSet<String>,
    #[serde(default)]
    pub total_tracklists: usize,
}

/// Either shape found in `scrape_state.json`: the run summary, or the bare
/// URL list older runs wrote to the same path
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredState {
    Urls(BTreeSet<String>),
    Summary(ScrapeState),
}

/// Counts reported by `collector status`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub collected_urls: usize,
    pub processed_urls: usize,
    pub tracklists: usize,
    pub empty_tracklists: usize,
    pub tracks: usize,
    pub last_run: Option<DateTime<Utc>>,
}

/// Handle on the raw data directory
#[derive(Debug, Clone)]
pub struct RawDataStore {
    dir: PathBuf,
}

impl RawDataStore {
    /// Open the store, creating the directory and empty processed/tracklists
    /// files when missing
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { dir: dir.into() };
        std::fs::create_dir_all(&store.dir)?;

        for path in [store.processed_path(), store.tracklists_path()] {
            if !path.exists() {
                write_json_atomic(&path, &Vec::<String>::new())?;
                tracing::debug!("Initialized {}", path.display());
            }
        }

        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn urls_path(&self) -> PathBuf {
        self.dir.join(URLS_FILE)
    }

    pub fn processed_path(&self) -> PathBuf {
        self.dir.join(PROCESSED_FILE)
    }

    pub fn tracklists_path(&self) -> PathBuf {
        self.dir.join(TRACKLISTS_FILE)
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Collected hrefs, or `None` when no URL file exists yet
    pub fn load_urls(&self) -> Result<Option<Vec<String>>> {
        let path = self.urls_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(read_json(&path)?))
    }

    /// Merge `urls` into the URL file (set union, written sorted)
    ///
    /// Returns the number of URLs in the file afterwards.
    pub fn save_urls<'a, I>(&self, urls: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut merged: BTreeSet<String> = self.load_urls()?.unwrap_or_default().into_iter().collect();
        merged.extend(urls.into_iter().cloned());
        write_json_atomic(&self.urls_path(), &merged)?;
        Ok(merged.len())
    }

    pub fn load_processed(&self) -> Result<BTreeSet<String>> {
        let path = self.processed_path();
        if !path.exists() {
            return Ok(BTreeSet::new());
        }
        read_json(&path)
    }

    pub fn save_processed(&self, processed: &BTreeSet<String>) -> Result<()> {
        write_json_atomic(&self.processed_path(), processed)
    }

    /// All stored tracklists
    ///
    /// Leading `[]` fragments (left by append-mode feed exports) are skipped.
    pub fn load_tracklists(&self) -> Result<Vec<Tracklist>> {
        let path = self.tracklists_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)?;
        parse_tracklists(&content)
            .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))
    }

    /// Append a tracklist unless one with the same URL is already stored
    ///
    /// Returns `false` for a duplicate. On success the run state is updated.
    pub fn save_tracklist(&self, tracklist: &Tracklist) -> Result<bool> {
        let mut tracklists = self.load_tracklists()?;
        if tracklists.iter().any(|t| t.url == tracklist.url) {
            tracing::info!(url = %tracklist.url, "Skipping already parsed tracklist");
            return Ok(false);
        }

        tracklists.push(tracklist.clone());
        write_json_atomic(&self.tracklists_path(), &tracklists)?;
        tracing::info!(
            url = %tracklist.url,
            total = tracklists.len(),
            "Saved new tracklist"
        );

        // Summary only; the tracklist itself is already written
        if let Err(e) = self.update_state(&tracklist.url, tracklists.len()) {
            tracing::warn!(url = %tracklist.url, error = %e, "Failed to update scrape state");
        }
        Ok(true)
    }

    /// Run summary from `scrape_state.json`
    ///
    /// A bare URL list is taken as `scraped_urls`. Content that is neither
    /// shape is logged and replaced by the default state.
    pub fn load_state(&self) -> Result<ScrapeState> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(ScrapeState::default());
        }
        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<StoredState>(&content) {
            Ok(StoredState::Summary(state)) => Ok(state),
            Ok(StoredState::Urls(scraped_urls)) => {
                tracing::debug!(path = %path.display(), "Reading URL-list scrape state");
                Ok(ScrapeState {
                    scraped_urls,
                    ..ScrapeState::default()
                })
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable scrape state, starting fresh");
                Ok(ScrapeState::default())
            }
        }
    }

    fn update_state(&self, url: &str, total_tracklists: usize) -> Result<()> {
        let mut state = self.load_state()?;
        state.scraped_urls.insert(url.to_string());
        state.last_run = Some(time::now());
        state.total_tracklists = total_tracklists;
        write_json_atomic(&self.state_path(), &state)
    }

    /// URLs of stored tracklists that have no tracks
    pub fn empty_tracklists(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .load_tracklists()?
            .into_iter()
            .filter(Tracklist::is_empty)
            .map(|t| t.url)
            .collect())
    }

    pub fn summary(&self) -> Result<StoreSummary> {
        let tracklists = self.load_tracklists()?;
        Ok(StoreSummary {
            collected_urls: self.load_urls()?.map(|u| u.len()).unwrap_or(0),
            processed_urls: self.load_processed()?.len(),
            tracklists: tracklists.len(),
            empty_tracklists: tracklists.iter().filter(|t| t.is_empty()).count(),
            tracks: tracklists.iter().map(|t| t.tracks.len()).sum(),
            last_run: self.load_state()?.last_run,
        })
    }
}

/// Parse `tracklists.json` content, skipping leading `[]` fragments
pub fn parse_tracklists(content: &str) -> serde_json::Result<Vec<Tracklist>> {
    let mut rest = content.trim_start();
    while let Some(stripped) = rest.strip_prefix("[]") {
        rest = stripped.trim_start();
    }
    if rest.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(rest)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Serialize `value` to `path` through a sibling temp file
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_common::Track;
    use tempfile::TempDir;

    fn tracklist(url: &str, tracks: usize) -> Tracklist {
        Tracklist {
            event: "Eric Prydz @ Printworks".to_string(),
            url: url.to_string(),
            tracks: (0..tracks)
                .map(|i| Track {
                    title: Some(format!("Track {}", i)),
                    artist: vec!["Eric Prydz".to_string()],
                    track_number: Some(i.to_string()),
                    ..Track::default()
                })
                .collect(),
            parsed_at: None,
        }
    }

    #[test]
    fn test_open_initializes_files() {
        let dir = TempDir::new().unwrap();
        let store = RawDataStore::open(dir.path().join("raw_data")).unwrap();

        assert_eq!(std::fs::read_to_string(store.processed_path()).unwrap().trim(), "[]");
        assert_eq!(std::fs::read_to_string(store.tracklists_path()).unwrap().trim(), "[]");
        assert!(!store.urls_path().exists());
        assert_eq!(store.load_urls().unwrap(), None);
    }

    #[test]
    fn test_open_keeps_existing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PROCESSED_FILE), r#"["https://x/tracklist/1.html"]"#).unwrap();

        let store = RawDataStore::open(dir.path()).unwrap();
        assert_eq!(store.load_processed().unwrap().len(), 1);
    }

    #[test]
    fn test_save_tracklist_dedupes_by_url_and_updates_state() {
        let dir = TempDir::new().unwrap();
        let store = RawDataStore::open(dir.path()).unwrap();

        assert!(store.save_tracklist(&tracklist("https://x/tracklist/a.html", 2)).unwrap());
        assert!(!store.save_tracklist(&tracklist("https://x/tracklist/a.html", 5)).unwrap());
        assert!(store.save_tracklist(&tracklist("https://x/tracklist/b.html", 0)).unwrap());

        let stored = store.load_tracklists().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].tracks.len(), 2);

        let state = store.load_state().unwrap();
        assert_eq!(state.total_tracklists, 2);
        assert_eq!(state.scraped_urls.len(), 2);
        assert!(state.last_run.is_some());

        let empty = store.empty_tracklists().unwrap();
        assert_eq!(empty.into_iter().collect::<Vec<_>>(), vec!["https://x/tracklist/b.html"]);
        assert!(!dir.path().join("tracklists.json.tmp").exists());
    }

    #[test]
    fn test_parse_tracklists_skips_leading_empty_arrays() {
        let content = r#"[]
            [][{"event": "e", "url": "https://x/tracklist/a.html", "tracks": []}]"#;
        let parsed = parse_tracklists(content).unwrap();
        assert_eq!(parsed.len(), 1);

        assert!(parse_tracklists("[]").unwrap().is_empty());
        assert!(parse_tracklists("{not json").is_err());
    }

    #[test]
    fn test_corrupt_tracklists_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = RawDataStore::open(dir.path()).unwrap();
        std::fs::write(store.tracklists_path(), "[{\"event\": ").unwrap();

        assert!(store.load_tracklists().is_err());
        assert!(store.save_tracklist(&tracklist("https://x/tracklist/a.html", 1)).is_err());
    }

    #[test]
    fn test_save_urls_is_a_union() {
        let dir = TempDir::new().unwrap();
        let store = RawDataStore::open(dir.path()).unwrap();

        let first = vec!["/tracklist/b.html".to_string(), "/tracklist/a.html".to_string()];
        assert_eq!(store.save_urls(&first).unwrap(), 2);

        let second = vec!["/tracklist/c.html".to_string(), "/tracklist/a.html".to_string()];
        assert_eq!(store.save_urls(&second).unwrap(), 3);

        assert_eq!(
            store.load_urls().unwrap().unwrap(),
            vec!["/tracklist/a.html", "/tracklist/b.html", "/tracklist/c.html"]
        );
    }

    #[test]
    fn test_summary_counts() {
        let dir = TempDir::new().unwrap();
        let store = RawDataStore::open(dir.path()).unwrap();
        store.save_urls(&vec!["/tracklist/a.html".to_string()]).unwrap();
        store.save_tracklist(&tracklist("https://x/tracklist/a.html", 3)).unwrap();
        store.save_tracklist(&tracklist("https://x/tracklist/b.html", 0)).unwrap();

        let summary = store.summary().unwrap();
        assert_eq!(summary.collected_urls, 1);
        assert_eq!(summary.tracklists, 2);
        assert_eq!(summary.empty_tracklists, 1);
        assert_eq!(summary.tracks, 3);
        assert!(summary.last_run.is_some());
    }

    #[test]
    fn test_url_list_state_file_is_read_and_upgraded() {
        let dir = TempDir::new().unwrap();
        let store = RawDataStore::open(dir.path()).unwrap();
        std::fs::write(store.state_path(), r#"["https://x/tracklist/old.html"]"#).unwrap();

        let state = store.load_state().unwrap();
        assert!(state.scraped_urls.contains("https://x/tracklist/old.html"));
        assert!(state.last_run.is_none());

        // Saving rewrites it as a summary that keeps the old URLs
        assert!(store.save_tracklist(&tracklist("https://x/tracklist/a.html", 1)).unwrap());
        let state = store.load_state().unwrap();
        assert_eq!(state.scraped_urls.len(), 2);
        assert_eq!(state.total_tracklists, 1);
        assert!(store.summary().unwrap().last_run.is_some());
    }

    #[test]
    fn test_unreadable_state_file_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let store = RawDataStore::open(dir.path()).unwrap();
        std::fs::write(store.state_path(), "42").unwrap();

        assert_eq!(store.load_state().unwrap(), ScrapeState::default());
        assert!(store.save_tracklist(&tracklist("https://x/tracklist/a.html", 1)).unwrap());
        assert_eq!(store.load_state().unwrap().total_tracklists, 1);
    }
}
