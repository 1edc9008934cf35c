//! HTML parsing for the DJ index pages and tracklist pages
//!
//! Parsers compile their selectors once at construction and are then used
//! for every page of a run. Parsing is synchronous: `scraper::Html` is not
//! `Send`, so documents never live across an `.await`.

pub mod captcha;
pub mod index_page;
pub mod tracklist_page;

pub use captcha::CaptchaDetector;
pub use index_page::IndexPageParser;
pub use tracklist_page::TracklistPageParser;

use crate::error::ParseError;
use scraper::Selector;

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(format!("{}: {:?}", css, e)))
}
