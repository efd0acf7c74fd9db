//! REST API served over HTTP.
//!
//! Every route lives under `/api` and speaks JSON. Handlers call the store
//! directly and turn its errors into [`crate::error::ApiError`] responses.

mod categories;
mod projects;
mod server;
mod tasks;
mod teams;
mod villas;

pub use server::{AppState, build_router, serve};

use crate::error::ApiError;
use crate::types::UnknownVariant;
use std::str::FromStr;

/// Parse a status path segment, naming the field on failure.
fn parse_status<T>(field: &str, value: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse::<T>()
        .map_err(|e| ApiError::invalid_value(field, &e.to_string()))
}
