//! Construction-project tracking backend.
//!
//! Projects contain villas, villas contain work categories, and categories
//! contain tasks carried out by teams. Task changes cascade into the
//! category, villa and (optionally) team aggregates inside one SQLite
//! transaction.

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;

pub use config::Config;
pub use db::Database;
pub use error::{ApiError, ErrorCode, StoreError};
