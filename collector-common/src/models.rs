//! Tracklist data model shared by the spider, the raw data store and the loader
//!
//! The JSON shape matches `raw_data/tracklists.json`: optional fields are
//! omitted rather than written as `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One parsed tracklist page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracklist {
    /// Event name (page `og:title`); `null` reads as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub event: String,
    /// Absolute page URL; unique key in the raw data store
    pub url: String,
    /// Tracks in page order
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// When the page was parsed
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::time::lenient_timestamp"
    )]
    pub parsed_at: Option<DateTime<Utc>>,
}

impl Tracklist {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One track entry of a tracklist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Cue time as shown on the page (e.g. "12:34")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(default)]
    pub artist: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_label: Option<String>,

    /// Played together with the previous track
    #[serde(default)]
    pub played_together: bool,

    /// Part of a mashup
    #[serde(default)]
    pub is_mashup_element: bool,

    /// Page identifier of this track occurrence (`tlp` div id without prefix)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_number: Option<String>,
}
