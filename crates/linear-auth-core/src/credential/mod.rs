//! The Linear API key and its validation rules

mod secret;
mod validator;

pub use secret::ApiKey;
pub use validator::{validate, validated, ValidationFailure, KEY_PREFIX, MIN_KEY_LENGTH};
