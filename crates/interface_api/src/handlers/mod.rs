//! Request handlers

pub mod billets;
pub mod configurations;
pub mod health;
pub mod remittances;

use std::fmt::Display;
use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path identifier, prefixed (`BLT-...`) or bare
pub(crate) fn parse_id<T>(raw: &str, entity: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|e| ApiError::BadRequest(format!("invalid {} id '{}': {}", entity, raw, e)))
}
