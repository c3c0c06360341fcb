//! Field parsers used by the environment loader.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::model::Protocol;

pub(crate) fn parse_port(field: &'static str, value: &str) -> ConfigResult<u16> {
    let port = value
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::invalid(field, value, "not_a_port"))?;
    if port == 0 {
        return Err(ConfigError::invalid(field, value, "zero_port"));
    }
    Ok(port)
}

pub(crate) fn parse_id(field: &'static str, value: &str) -> ConfigResult<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::invalid(field, value, "not_a_numeric_id"))
}

/// Parse a number of seconds; `0` yields `None` when `allow_disable` is set.
pub(crate) fn parse_seconds(
    field: &'static str,
    value: &str,
    allow_disable: bool,
) -> ConfigResult<Option<Duration>> {
    let secs = value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::invalid(field, value, "not_a_number"))?;
    match (secs, allow_disable) {
        (0, true) => Ok(None),
        (0, false) => Err(ConfigError::invalid(field, value, "must_be_positive")),
        (secs, _) => Ok(Some(Duration::from_secs(secs))),
    }
}

pub(crate) fn parse_protocol(field: &'static str, value: &str) -> ConfigResult<Protocol> {
    match value.trim().to_ascii_lowercase().as_str() {
        "http" => Ok(Protocol::Http),
        "https" => Ok(Protocol::Https),
        _ => Err(ConfigError::invalid(field, value, "unknown_protocol")),
    }
}

pub(crate) fn parse_root(field: &'static str, value: &str) -> ConfigResult<PathBuf> {
    let path = PathBuf::from(value.trim());
    if !path.is_absolute() {
        return Err(ConfigError::invalid(field, value, "must_be_absolute"));
    }
    Ok(path)
}

/// Parse a comma-separated milestone list into an ascending, de-duplicated set.
pub(crate) fn parse_milestones(field: &'static str, value: &str) -> ConfigResult<Vec<u8>> {
    let mut milestones = Vec::new();
    for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let milestone = part
            .parse::<u8>()
            .map_err(|_| ConfigError::invalid(field, value, "not_a_percentage"))?;
        if !(1..=100).contains(&milestone) {
            return Err(ConfigError::invalid(field, value, "out_of_range"));
        }
        milestones.push(milestone);
    }
    if milestones.is_empty() {
        return Err(ConfigError::invalid(field, value, "empty"));
    }
    milestones.sort_unstable();
    milestones.dedup();
    Ok(milestones)
}

pub(crate) fn parse_tolerance(field: &'static str, value: &str) -> ConfigResult<u8> {
    let tolerance = value
        .trim()
        .parse::<u8>()
        .map_err(|_| ConfigError::invalid(field, value, "not_a_number"))?;
    if tolerance > 50 {
        return Err(ConfigError::invalid(field, value, "out_of_range"));
    }
    Ok(tolerance)
}

pub(crate) fn parse_http_url(field: &'static str, value: &str) -> ConfigResult<String> {
    let trimmed = value.trim().trim_end_matches('/');
    let has_scheme = trimmed.starts_with("http://") || trimmed.starts_with("https://");
    let has_host = trimmed
        .split_once("://")
        .is_some_and(|(_, rest)| !rest.is_empty());
    if !has_scheme || !has_host {
        return Err(ConfigError::invalid(field, value, "not_an_http_url"));
    }
    Ok(trimmed.to_string())
}

/// Map the operator-facing level names onto tracing directives.
///
/// Unknown names fall back to `info`.
#[must_use]
pub fn normalize_log_level(value: &str) -> &'static str {
    match value.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}
