//! Shape checks applied to a candidate API key before it is stored

use serde::Serialize;
use std::fmt;

use super::ApiKey;

/// Every Linear personal API key starts with this literal
pub const KEY_PREFIX: &str = "lin_api_";

/// Shortest trimmed key accepted for storage
pub const MIN_KEY_LENGTH: usize = 20;

/// Why a candidate key was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFailure {
    /// Nothing was supplied
    Required,
    /// The key lacks the `lin_api_` prefix
    WrongFormat,
    /// The key is shorter than [`MIN_KEY_LENGTH`]
    Truncated,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "API key is required"),
            Self::WrongFormat => write!(
                f,
                "wrong format: Linear API keys start with \"{}\"",
                KEY_PREFIX
            ),
            Self::Truncated => write!(f, "API key appears truncated"),
        }
    }
}

impl std::error::Error for ValidationFailure {}

/// Check the syntactic shape of a candidate key.
///
/// The input is never modified; callers store the trimmed value.
pub fn validate(candidate: &str) -> Result<(), ValidationFailure> {
    if candidate.is_empty() {
        return Err(ValidationFailure::Required);
    }

    let trimmed = candidate.trim();

    if !trimmed.starts_with(KEY_PREFIX) {
        return Err(ValidationFailure::WrongFormat);
    }

    if trimmed.chars().count() < MIN_KEY_LENGTH {
        return Err(ValidationFailure::Truncated);
    }

    Ok(())
}

/// Validate and return the trimmed key ready for storage
pub fn validated(candidate: &str) -> Result<ApiKey, ValidationFailure> {
    validate(candidate)?;
    Ok(ApiKey::new(candidate.trim()))
}
