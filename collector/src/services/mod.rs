//! Crawl services: page fetching, URL collection and tracklist scraping

pub mod page_client;
pub mod tracklist_spider;
pub mod url_collector;

pub use page_client::PageClient;
pub use tracklist_spider::{ScrapeSummary, TracklistSpider};
pub use url_collector::{compare_urls, CollectSummary, UrlCollector};
