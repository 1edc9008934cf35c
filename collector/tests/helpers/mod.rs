//! Test Helper Utilities
//!
//! Shared utilities for testing the collector

#![allow(dead_code)]

pub mod fake_site;

// Re-export commonly used items
pub use fake_site::{crawl_config, index_page, tracklist_page, FakeSite, RunningSite, CAPTCHA_PAGE};
