// Username rules
use thiserror::Error;

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsernameError {
    #[error("Username is empty")]
    Empty,

    #[error("Username must be at least 3 characters")]
    TooShort,

    #[error("Username must be at most 20 characters")]
    TooLong,

    #[error("Username may only contain letters, digits and underscores")]
    InvalidCharacters,
}

/// Validate a raw username and return its trimmed form.
pub fn validate_username(raw: &str) -> Result<String, UsernameError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UsernameError::Empty);
    }

    let len = trimmed.chars().count();
    if len < MIN_LEN {
        return Err(UsernameError::TooShort);
    }
    if len > MAX_LEN {
        return Err(UsernameError::TooLong);
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(UsernameError::InvalidCharacters);
    }

    Ok(trimmed.to_string())
}
