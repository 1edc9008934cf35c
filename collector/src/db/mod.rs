//! PostgreSQL access for the loader

pub mod loader;
pub mod schema;

pub use loader::{LoadSummary, TracklistLoader};

use crate::error::CollectorResult;
use collector_common::credentials::DbCredentials;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

/// Open a connection pool from `DB_*` credentials
pub async fn connect(creds: &DbCredentials, max_connections: u32) -> CollectorResult<PgPool> {
    if creds.is_placeholder() {
        tracing::warn!("Database credentials still hold setup placeholders; edit the credentials file");
    }

    let options = PgConnectOptions::new()
        .host(&creds.host)
        .port(creds.port)
        .username(&creds.user)
        .password(&creds.password)
        .database(&creds.name);

    tracing::debug!(host = %creds.host, port = creds.port, database = %creds.name, "Connecting to database");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Open a connection pool from a `postgres://` URL
pub async fn connect_url(url: &str, max_connections: u32) -> CollectorResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(url)
        .await?;
    Ok(pool)
}
