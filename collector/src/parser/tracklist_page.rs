//! Tracklist page parsing
//!
//! A tracklist page carries the event name in `og:title` and one
//! `div#tlp<n>` per track occurrence, with schema.org `itemprop` metas for
//! title, artists and label. Cue times sit in `.cueValueField`. A track that
//! was played on top of the previous one is flagged on its track number span.

use super::selector;
use crate::error::ParseError;
use collector_common::time;
use collector_common::{Track, Tracklist};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

const TRACK_ID_PREFIX: &str = "tlp";
const CONTENT_ID_SUFFIX: &str = "_content";
const PLAYED_TOGETHER_TITLE: &str = "played together with previous track";

pub struct TracklistPageParser {
    og_title: Selector,
    title_element: Selector,
    track_divs: Selector,
    played_together: Selector,
    name: Selector,
    artist: Selector,
    record_label: Selector,
    cue: Selector,
}

impl TracklistPageParser {
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            og_title: selector(r#"meta[property="og:title"]"#)?,
            title_element: selector(".tracklistTitle")?,
            track_divs: selector(r#"div[id^="tlp"]"#)?,
            played_together: selector(&format!(
                r#"span[id$="_tracknumber_value"][title="{}"]"#,
                PLAYED_TOGETHER_TITLE
            ))?,
            name: selector(r#"meta[itemprop="name"]"#)?,
            artist: selector(r#"meta[itemprop="byArtist"]"#)?,
            record_label: selector(r#"meta[itemprop="recordLabel"]"#)?,
            cue: selector(".cueValueField")?,
        })
    }

    /// Parse a tracklist page fetched from `url`
    pub fn parse(&self, html: &str, url: &str) -> Result<Tracklist, ParseError> {
        let document = Html::parse_document(html);

        let event = self.event_name(&document).ok_or(ParseError::MissingEvent)?;
        let tracks = self.tracks(&document);
        if tracks.is_empty() {
            return Err(ParseError::NoTracks);
        }

        tracing::debug!(url = %url, event = %event, tracks = tracks.len(), "Parsed tracklist");

        Ok(Tracklist {
            event,
            url: url.to_string(),
            tracks,
            parsed_at: Some(time::now()),
        })
    }

    fn event_name(&self, document: &Html) -> Option<String> {
        let from_meta = document
            .select(&self.og_title)
            .next()
            .and_then(|meta| meta.value().attr("content"))
            .and_then(non_empty);

        from_meta.or_else(|| {
            tracing::debug!("No og:title meta, falling back to .tracklistTitle");
            document
                .select(&self.title_element)
                .next()
                .and_then(|el| non_empty(&el.text().collect::<String>()))
        })
    }

    fn tracks(&self, document: &Html) -> Vec<Track> {
        // Span ids look like tlp<trno>_tracknumber_value
        let played_together: HashSet<&str> = document
            .select(&self.played_together)
            .filter_map(|span| span.value().attr("id"))
            .collect();

        let mut seen = HashSet::new();
        let mut tracks = Vec::new();

        for div in document.select(&self.track_divs) {
            let Some(id) = div.value().attr("id") else {
                continue;
            };
            if id.ends_with(CONTENT_ID_SUFFIX) {
                continue;
            }

            let track_number = id.strip_prefix(TRACK_ID_PREFIX).unwrap_or(id).to_string();
            if !seen.insert(track_number.clone()) {
                tracing::debug!(track_number = %track_number, "Skipping duplicate track");
                continue;
            }

            let played = div
                .value()
                .attr("data-trno")
                .map(|trno| {
                    played_together.contains(format!("tlp{}_tracknumber_value", trno).as_str())
                })
                .unwrap_or(false);

            tracks.push(Track {
                title: self.meta_content(&div, &self.name),
                time: div
                    .select(&self.cue)
                    .next()
                    .and_then(|el| non_empty(&el.text().collect::<String>())),
                artist: div
                    .select(&self.artist)
                    .filter_map(|meta| meta.value().attr("content"))
                    .filter_map(non_empty)
                    .collect(),
                record_label: self.meta_content(&div, &self.record_label),
                played_together: played,
                is_mashup_element: div.value().attr("data-mashpos").is_some(),
                track_number: Some(track_number),
            });
        }

        tracks
    }

    fn meta_content(&self, div: &ElementRef<'_>, sel: &Selector) -> Option<String> {
        div.select(sel)
            .next()
            .and_then(|meta| meta.value().attr("content"))
            .and_then(non_empty)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.1001tracklists.com/tracklist/2abc/eric-prydz-ushuaia-ibiza-2023-07-14.html";

    fn page(head: &str, body: &str) -> String {
        format!("<html><head>{}</head><body>{}</body></html>", head, body)
    }

    const OG: &str = r#"<meta property="og:title" content=" Eric Prydz @ Ushuaia Ibiza 2023-07-14 ">"#;

    #[test]
    fn test_parses_track_fields() {
        let body = r#"
            <div id="tlp1" data-trno="1">
              <span id="tlp1_tracknumber_value">01</span>
              <div class="cueValueField"> 0:00 </div>
              <meta itemprop="name" content=" Opus ">
              <meta itemprop="byArtist" content="Eric Prydz">
              <meta itemprop="recordLabel" content="Pryda">
            </div>
            <div id="tlp1_content">ignored</div>
            <div id="tlp2" data-trno="2" data-mashpos="1">
              <span id="tlp2_tracknumber_value" title="played together with previous track">w/</span>
              <meta itemprop="name" content="Pjanoo">
              <meta itemprop="byArtist" content="Eric Prydz">
              <meta itemprop="byArtist" content="Cirez D">
            </div>"#;

        let parser = TracklistPageParser::new().unwrap();
        let tracklist = parser.parse(&page(OG, body), URL).unwrap();

        assert_eq!(tracklist.event, "Eric Prydz @ Ushuaia Ibiza 2023-07-14");
        assert_eq!(tracklist.url, URL);
        assert!(tracklist.parsed_at.is_some());
        assert_eq!(tracklist.tracks.len(), 2);

        let first = &tracklist.tracks[0];
        assert_eq!(first.title.as_deref(), Some("Opus"));
        assert_eq!(first.time.as_deref(), Some("0:00"));
        assert_eq!(first.artist, vec!["Eric Prydz"]);
        assert_eq!(first.record_label.as_deref(), Some("Pryda"));
        assert!(!first.played_together);
        assert!(!first.is_mashup_element);
        assert_eq!(first.track_number.as_deref(), Some("1"));

        let second = &tracklist.tracks[1];
        assert_eq!(second.artist, vec!["Eric Prydz", "Cirez D"]);
        assert!(second.played_together);
        assert!(second.is_mashup_element);
        assert!(second.time.is_none());
        assert!(second.record_label.is_none());
    }

    #[test]
    fn test_duplicate_track_numbers_are_skipped() {
        let body = r#"
            <div id="tlp5" data-trno="5"><meta itemprop="name" content="First"></div>
            <div id="tlp5" data-trno="5"><meta itemprop="name" content="Again"></div>"#;

        let parser = TracklistPageParser::new().unwrap();
        let tracklist = parser.parse(&page(OG, body), URL).unwrap();
        assert_eq!(tracklist.tracks.len(), 1);
        assert_eq!(tracklist.tracks[0].title.as_deref(), Some("First"));
    }

    #[test]
    fn test_event_falls_back_to_title_element() {
        let body = r#"<h1 class="tracklistTitle"> Eric Prydz @ HOLO </h1>
            <div id="tlp1" data-trno="1"></div>"#;

        let parser = TracklistPageParser::new().unwrap();
        let tracklist = parser.parse(&page("", body), URL).unwrap();
        assert_eq!(tracklist.event, "Eric Prydz @ HOLO");
        assert_eq!(tracklist.tracks[0].title, None);
        assert!(tracklist.tracks[0].artist.is_empty());
    }

    #[test]
    fn test_missing_event_is_an_error() {
        let parser = TracklistPageParser::new().unwrap();
        let err = parser
            .parse(&page("", r#"<div id="tlp1"></div>"#), URL)
            .unwrap_err();
        assert_eq!(err, ParseError::MissingEvent);
    }

    #[test]
    fn test_page_without_tracks_is_an_error() {
        let parser = TracklistPageParser::new().unwrap();
        let err = parser
            .parse(&page(OG, r#"<div id="tlp1_content"></div>"#), URL)
            .unwrap_err();
        assert_eq!(err, ParseError::NoTracks);
    }
}
