//! Setlist collector library
//!
//! Collects Eric Prydz tracklists from 1001tracklists.com into a raw JSON
//! store and loads them into PostgreSQL. The `collector` binary wires these
//! modules to its subcommands; integration tests use them directly.

pub mod db;
pub mod error;
pub mod parser;
pub mod services;
pub mod setup;
pub mod store;

pub use crate::error::{CollectorError, CollectorResult, FetchError, ParseError};
pub use crate::store::RawDataStore;
