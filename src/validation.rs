//! Input validation for entry names and values.
//!
//! Runs before any storage call. A value that fails here never reaches a
//! backend.

use crate::constants::{MAX_NAME_LENGTH, MAX_VALUE_LENGTH};
use crate::utils::char_len;
use std::fmt;

/// The input being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Value,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => f.write_str("name"),
            Self::Value => f.write_str("value"),
        }
    }
}

/// Reasons a name or value is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Input exceeds its character limit.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: Field, max: usize },

    /// Name contains something other than letters, digits, `_` or `-`.
    #[error("name may only contain letters, digits, underscores and hyphens")]
    InvalidCharacters,
}

/// Validates an entry name.
///
/// # Rules
/// - At most [`MAX_NAME_LENGTH`] characters
/// - Only ASCII letters, digits, underscore and hyphen
/// - At least one character
///
/// # Examples
/// ```
/// use vault::validation::{validate_name, ValidationError};
///
/// assert!(validate_name("api-key_2").is_ok());
/// assert_eq!(validate_name("my key"), Err(ValidationError::InvalidCharacters));
/// ```
///
/// # Errors
///
/// Returns [`ValidationError::TooLong`] before checking characters, so an
/// over-long name with bad characters reports its length.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if char_len(name) > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: Field::Name,
            max: MAX_NAME_LENGTH,
        });
    }

    if name.is_empty() || !name.chars().all(is_name_char) {
        return Err(ValidationError::InvalidCharacters);
    }

    Ok(())
}

/// Validates an entry value. Any content is allowed, including the empty
/// string, up to [`MAX_VALUE_LENGTH`] characters.
///
/// # Errors
///
/// Returns [`ValidationError::TooLong`] if the value is over the limit.
pub fn validate_value(value: &str) -> Result<(), ValidationError> {
    if char_len(value) > MAX_VALUE_LENGTH {
        return Err(ValidationError::TooLong {
            field: Field::Value,
            max: MAX_VALUE_LENGTH,
        });
    }
    Ok(())
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
