//! DJ index page link extraction
//!
//! Tracklist links appear as plain anchors and, in the list view, as
//! `div.bItm.action.oItm` items whose `onclick` opens the tracklist.

use super::selector;
use crate::error::ParseError;
use scraper::{Html, Selector};
use std::collections::HashSet;

/// Path fragment every tracklist link contains
pub const TRACKLIST_PATH_MARKER: &str = "/tracklist/";

pub struct IndexPageParser {
    anchors: Selector,
    onclick_items: Selector,
}

impl IndexPageParser {
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            anchors: selector(r#"a[href*="/tracklist/"]"#)?,
            onclick_items: selector("div.bItm.action.oItm")?,
        })
    }

    /// Tracklist hrefs as they appear on the page, deduplicated, in
    /// document order (anchors first, then onclick items)
    pub fn extract_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        let anchors = document
            .select(&self.anchors)
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_string);

        let onclicks = document
            .select(&self.onclick_items)
            .filter_map(|div| div.value().attr("onclick"))
            .filter_map(onclick_target);

        for href in anchors.chain(onclicks) {
            let href = href.trim().to_string();
            if href.contains(TRACKLIST_PATH_MARKER) && seen.insert(href.clone()) {
                links.push(href);
            }
        }

        links
    }
}

/// First single-quoted string of an `onclick` handler,
/// e.g. `window.open('/tracklist/x/y.html')`
fn onclick_target(onclick: &str) -> Option<String> {
    onclick.split('\'').nth(1).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_HTML: &str = r#"
        <html><body>
          <div class="bItm action oItm" onclick="window.open('/tracklist/2abc/eric-prydz-ushuaia-ibiza-2023-07-14.html')">
            <div class="bTitle"><a href="/tracklist/2abc/eric-prydz-ushuaia-ibiza-2023-07-14.html">Ushuaia</a></div>
          </div>
          <div class="bItm action oItm" onclick="window.open('/tracklist/9xyz/eric-prydz-holo-london-2022-10-01.html')"></div>
          <a href="/tracklist/1def/eric-prydz-creamfields-2019-08-25.html">Creamfields</a>
          <a href="/dj/ericprydz/index2.html">Next</a>
          <div class="bItm action oItm" onclick="return false;"></div>
        </body></html>"#;

    #[test]
    fn test_extracts_anchors_and_onclick_items() {
        let parser = IndexPageParser::new().unwrap();
        let links = parser.extract_links(INDEX_HTML);
        assert_eq!(
            links,
            vec![
                "/tracklist/2abc/eric-prydz-ushuaia-ibiza-2023-07-14.html",
                "/tracklist/1def/eric-prydz-creamfields-2019-08-25.html",
                "/tracklist/9xyz/eric-prydz-holo-london-2022-10-01.html",
            ]
        );
    }

    #[test]
    fn test_page_without_tracklists() {
        let parser = IndexPageParser::new().unwrap();
        assert!(parser
            .extract_links("<html><body><a href='/dj/ericprydz/'>x</a></body></html>")
            .is_empty());
    }

    #[test]
    fn test_onclick_target() {
        assert_eq!(
            onclick_target("window.open('/tracklist/a/b.html')").as_deref(),
            Some("/tracklist/a/b.html")
        );
        assert_eq!(onclick_target("void(0)"), None);
    }
}
