//! Centralized validation helpers for configuration and caller input.

/// Maximum number of names accepted in a single resolve request (DOS protection)
pub const MAX_RESOLVE_NAMES: usize = 10_000;

/// Longest name accepted for lookup, in bytes
pub const MAX_NAME_LENGTH: usize = 1_024;

/// Largest store write batch accepted from configuration
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Validation error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: String },
    #[error("{field} must be greater than zero")]
    NotPositive { field: String },
    #[error("{field} must be at most {max}, got {value}")]
    TooLarge {
        field: String,
        value: usize,
        max: usize,
    },
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} must be \"http\" or \"https\", got {value:?}")]
    UnsupportedScheme { field: String, value: String },
    #[error("{field} must start with '/', got {value:?}")]
    InvalidPath { field: String, value: String },
    #[error("Too many names: {count} exceeds maximum of {MAX_RESOLVE_NAMES}")]
    TooManyNames { count: usize },
    #[error("Name too long: {length} bytes exceeds maximum of {MAX_NAME_LENGTH}")]
    NameTooLong { length: usize },
}

/// Require a non-blank string.
///
/// # Errors
///
/// Returns `ValidationError::Empty` if the value is blank.
pub fn check_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Require a count greater than zero.
///
/// # Errors
///
/// Returns `ValidationError::NotPositive` for zero.
pub fn check_positive(field: &str, value: usize) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::NotPositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Require a count no larger than `max`.
///
/// # Errors
///
/// Returns `ValidationError::TooLarge` when the value exceeds `max`.
pub fn check_at_most(field: &str, value: usize, max: usize) -> Result<(), ValidationError> {
    if value > max {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            value,
            max,
        });
    }
    Ok(())
}

/// Require `min <= value <= max`. NaN is always rejected.
///
/// # Errors
///
/// Returns `ValidationError::OutOfRange` when the value falls outside the bounds.
pub fn check_in_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !(min..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Only plain HTTP(S) origins are supported.
///
/// # Errors
///
/// Returns `ValidationError::UnsupportedScheme` for any other scheme.
pub fn check_url_scheme(field: &str, value: &str) -> Result<(), ValidationError> {
    match value {
        "http" | "https" => Ok(()),
        _ => Err(ValidationError::UnsupportedScheme {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Require an absolute request path.
///
/// # Errors
///
/// Returns `ValidationError::InvalidPath` if the path is not absolute.
pub fn check_url_path(field: &str, value: &str) -> Result<(), ValidationError> {
    if !value.starts_with('/') {
        return Err(ValidationError::InvalidPath {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Validate names supplied by a caller before resolving them.
///
/// # Examples
///
/// ```
/// use catalog_sync::utils::validation::validate_names;
///
/// assert!(validate_names(&["Portal 2".to_string()]).is_ok());
/// assert!(validate_names(&["x".repeat(5_000)]).is_err());
/// ```
///
/// # Errors
///
/// Returns `ValidationError::TooManyNames` if more than [`MAX_RESOLVE_NAMES`]
/// names are given, or `ValidationError::NameTooLong` for an oversized name.
pub fn validate_names(names: &[String]) -> Result<(), ValidationError> {
    if names.len() > MAX_RESOLVE_NAMES {
        return Err(ValidationError::TooManyNames { count: names.len() });
    }
    if let Some(name) = names.iter().find(|n| n.len() > MAX_NAME_LENGTH) {
        return Err(ValidationError::NameTooLong { length: name.len() });
    }
    Ok(())
}
