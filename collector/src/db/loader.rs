//! Tracklist loader
//!
//! Inserts every stored tracklist and its tracks into PostgreSQL in a single
//! transaction. Tracklists whose URL is already in the table are skipped, so
//! loading the same raw data twice adds nothing.

use super::schema::{create_tables, validate_schema_name};
use crate::error::CollectorResult;
use chrono::{DateTime, NaiveDateTime, Utc};
use collector_common::time;
use collector_common::Tracklist;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashSet;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// One `track` row, ready to bind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRow {
    pub title: String,
    pub artist: Vec<String>,
    pub played_together: bool,
    pub is_mashup_element: bool,
    pub track_number: Option<String>,
    /// 1-based position within the tracklist
    pub position: i32,
}

/// One `tracklist` row with its tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracklistRow {
    pub url: String,
    pub parsed_at: NaiveDateTime,
    pub tracks: Vec<TrackRow>,
}

impl TracklistRow {
    /// Apply loader defaults: missing title and empty artist lists get
    /// placeholders, a missing `parsed_at` becomes `now`
    pub fn prepare(tracklist: &Tracklist, now: DateTime<Utc>) -> Self {
        let tracks = tracklist
            .tracks
            .iter()
            .enumerate()
            .map(|(idx, track)| TrackRow {
                title: track
                    .title
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
                artist: if track.artist.is_empty() {
                    vec![UNKNOWN_ARTIST.to_string()]
                } else {
                    track.artist.clone()
                },
                played_together: track.played_together,
                is_mashup_element: track.is_mashup_element,
                track_number: track.track_number.clone(),
                position: idx as i32 + 1,
            })
            .collect();

        Self {
            url: tracklist.url.clone(),
            parsed_at: tracklist.parsed_at.unwrap_or(now).naive_utc(),
            tracks,
        }
    }
}

/// Loader statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub tracklists_read: usize,
    pub tracklists_inserted: usize,
    pub tracklists_skipped: usize,
    pub tracks_inserted: usize,
}

pub struct TracklistLoader {
    db: PgPool,
    schema: String,
}

impl TracklistLoader {
    pub fn new(db: PgPool, schema: impl Into<String>) -> CollectorResult<Self> {
        let schema = schema.into();
        validate_schema_name(&schema)?;
        Ok(Self { db, schema })
    }

    /// Create the schema and tables if needed
    pub async fn init_schema(&self) -> CollectorResult<()> {
        create_tables(&self.db, &self.schema).await
    }

    /// Insert `tracklists`, skipping URLs already loaded
    ///
    /// **Algorithm:**
    /// 1. Begin transaction
    /// 2. Read the URLs already in `tracklist`
    /// 3. For each new tracklist: insert it `RETURNING id`, then batch insert
    ///    its tracks with 1-based positions
    /// 4. Commit once
    pub async fn load(&self, tracklists: &[Tracklist]) -> CollectorResult<LoadSummary> {
        let mut summary = LoadSummary {
            tracklists_read: tracklists.len(),
            ..LoadSummary::default()
        };
        let now = time::now();

        let mut tx = self.db.begin().await?;

        let mut existing: HashSet<String> =
            sqlx::query_scalar::<_, String>(&format!("SELECT url FROM {}.tracklist", self.schema))
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .collect();

        let insert_tracklist = format!(
            "INSERT INTO {}.tracklist (url, parsed_at) VALUES ($1, $2) RETURNING id",
            self.schema
        );

        for tracklist in tracklists {
            if existing.contains(&tracklist.url) {
                summary.tracklists_skipped += 1;
                tracing::debug!(url = %tracklist.url, "Tracklist already loaded");
                continue;
            }

            let row = TracklistRow::prepare(tracklist, now);

            let tracklist_id: i32 = sqlx::query_scalar(&insert_tracklist)
                .bind(&row.url)
                .bind(row.parsed_at)
                .fetch_one(&mut *tx)
                .await?;

            if !row.tracks.is_empty() {
                let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                    "INSERT INTO {}.track (tracklist_id, title, artist, played_together, is_mashup_element, track_number, position) ",
                    self.schema
                ));
                builder.push_values(&row.tracks, |mut b, track| {
                    b.push_bind(tracklist_id)
                        .push_bind(track.title.clone())
                        .push_bind(track.artist.clone())
                        .push_bind(track.played_together)
                        .push_bind(track.is_mashup_element)
                        .push_bind(track.track_number.clone())
                        .push_bind(track.position);
                });
                builder.build().execute(&mut *tx).await?;
            }

            tracing::debug!(
                tracklist_id,
                url = %row.url,
                tracks = row.tracks.len(),
                "Inserted tracklist"
            );

            summary.tracklists_inserted += 1;
            summary.tracks_inserted += row.tracks.len();
            existing.insert(row.url);
        }

        tx.commit().await?;

        tracing::info!(
            read = summary.tracklists_read,
            inserted = summary.tracklists_inserted,
            skipped = summary.tracklists_skipped,
            tracks = summary.tracks_inserted,
            "Load complete"
        );

        Ok(summary)
    }
}
