//! Shared configuration helpers.
//!
//! Configuration is read through a lookup function rather than directly from
//! the process environment, so tests can supply variables without touching
//! global state. [`env_lookup`] is the production lookup.

use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while building configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set but does not parse.
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },

    /// A variable parsed but is outside its allowed range.
    #[error("{name} is out of range: {reason}")]
    OutOfRange { name: String, reason: String },

    /// A component could not be built from otherwise valid settings.
    #[error("{what} could not be configured: {reason}")]
    Unusable { what: String, reason: String },
}

/// Read a variable from the process environment.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// A non-empty, trimmed string variable.
pub fn string_var<L>(lookup: &L, name: &str) -> Option<String>
where
    L: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, returning `None` when it is unset or empty.
pub fn parse_var<L, T>(lookup: &L, name: &str) -> Result<Option<T>, ConfigError>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match string_var(lookup, name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                name: name.to_string(),
                value: raw,
                reason: e.to_string(),
            }),
    }
}

/// Parse a strictly positive integer variable with a default.
pub fn positive_var<L>(lookup: &L, name: &str, default: u64) -> Result<u64, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    let value = parse_var::<_, u64>(lookup, name)?.unwrap_or(default);
    if value == 0 {
        return Err(ConfigError::OutOfRange {
            name: name.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}
