//! # Setlist Collector Common Library
//!
//! Shared code for the collector crates:
//! - Error type
//! - Configuration loading
//! - Database credentials file
//! - Tracklist data model
//! - Time helpers

pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::{Track, Tracklist};
