//! Input validation primitives.
//!
//! Environment, app and prefix names end up inside git ref names and platform
//! CLI arguments, so they are restricted to a conservative character set.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("name pattern is a valid regex")
    })
}

/// Returns true when `value` can be used as an environment, app or tag prefix name.
pub fn is_valid_name(value: &str) -> bool {
    name_pattern().is_match(value) && !value.contains("..") && !value.ends_with(".lock")
}

/// Require a name argument to be usable in refs and platform commands.
pub fn require_name<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = require_non_empty(value, field, "Cannot be empty")?;
    if is_valid_name(trimmed) {
        Ok(trimmed)
    } else {
        Err(Error::validation_invalid_argument(
            field,
            format!(
                "'{}' may only contain letters, digits, '.', '_' and '-'",
                trimmed
            ),
        ))
    }
}

/// Require a string to be non-empty after trimming.
///
/// Returns a reference to the trimmed string on success.
pub fn require_non_empty<'a>(value: &'a str, field: &str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation_invalid_argument(field, message))
    } else {
        Ok(trimmed)
    }
}
