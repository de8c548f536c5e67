//! Environment-variable helpers for service configuration.
//!
//! Services build their config structs by hand from these helpers so that every
//! misconfiguration surfaces at startup as an `anyhow` error naming the variable.

use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, anyhow};

/// Read a required variable. Empty values count as missing.
pub fn required(name: &str) -> anyhow::Result<String> {
    optional(name).with_context(|| format!("{name} must be set"))
}

/// Read an optional variable. Empty values count as unset.
pub fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse a variable, falling back to `default` when it is unset.
pub fn parse_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    parse_value(name, optional(name), default)
}

fn parse_value<T>(name: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{name}={raw:?} is invalid: {e}")),
    }
}
