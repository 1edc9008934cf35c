//! Tracklist schema creation
//!
//! ```sql
//! tracklist (id, url, parsed_at)
//! track     (id, tracklist_id -> tracklist.id, title, artist[], played_together,
//!            is_mashup_element, track_number, position)
//! ```
//!
//! The schema name comes from config and is spliced into the SQL, so it is
//! checked to be a plain identifier first.

use crate::error::CollectorResult;
use collector_common::Error;
use sqlx::PgPool;

/// Reject anything that is not `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_schema_name(schema: &str) -> Result<(), Error> {
    let mut chars = schema.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && schema.len() <= 63 {
        Ok(())
    } else {
        Err(Error::Config(format!("Invalid database schema name '{}'", schema)))
    }
}

/// DDL statements for `schema`, in execution order
pub fn ddl_statements(schema: &str) -> Vec<String> {
    vec![
        format!("CREATE SCHEMA IF NOT EXISTS {}", schema),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {schema}.tracklist (
                id INTEGER GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                url TEXT NOT NULL,
                parsed_at TIMESTAMP
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {schema}.track (
                id INTEGER GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                tracklist_id INTEGER REFERENCES {schema}.tracklist(id),
                title TEXT NOT NULL,
                artist TEXT[] NOT NULL,
                played_together BOOLEAN NOT NULL,
                is_mashup_element BOOLEAN NOT NULL,
                track_number TEXT,
                position INTEGER NOT NULL
            )
            "#
        ),
    ]
}

/// Create the schema and both tables if they don't exist
pub async fn create_tables(pool: &PgPool, schema: &str) -> CollectorResult<()> {
    validate_schema_name(schema)?;

    for statement in ddl_statements(schema) {
        sqlx::query(&statement).execute(pool).await?;
    }

    tracing::info!(schema = %schema, "Database tables initialized (tracklist, track)");
    Ok(())
}
