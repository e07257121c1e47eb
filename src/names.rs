//! Display name and lobby name validation
//!
//! Names are trimmed of surrounding whitespace, must not be empty, must fit
//! the configured length, and must not be flagged as inappropriate.

use rustrict::CensorStr;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during name validation
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The name is empty or contains only whitespace
    #[error("name cannot be empty")]
    Empty,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Sinful,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
}

/// Validates a name and returns its trimmed form
///
/// # Errors
///
/// * `Error::TooLong` - Name exceeds `max_length` bytes
/// * `Error::Empty` - Name is empty after trimming whitespace
/// * `Error::Sinful` - Name contains inappropriate content
pub fn clean(name: &str, max_length: usize) -> Result<String, Error> {
    if name.len() > max_length {
        return Err(Error::TooLong);
    }
    let name = rustrict::trim_whitespace(name);
    if name.is_empty() {
        return Err(Error::Empty);
    }
    if name.is_inappropriate() {
        return Err(Error::Sinful);
    }
    Ok(name.to_owned())
}

/// Validates a player's display name
///
/// # Errors
///
/// See [`clean`].
pub fn display_name(name: &str) -> Result<String, Error> {
    clean(name, crate::constants::names::MAX_LENGTH)
}

/// Validates a lobby name
///
/// # Errors
///
/// See [`clean`].
pub fn lobby_name(name: &str) -> Result<String, Error> {
    clean(name, crate::constants::lobby::MAX_NAME_LENGTH)
}
