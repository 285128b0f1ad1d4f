use std::env;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Reads a boolean env var: accepts true/false/1/0 (case-insensitive)
pub fn env_is_true(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => {
            let v = v.trim();
            v.eq_ignore_ascii_case("true") || v == "1"
        }
        Err(_) => default,
    }
}

/// Reads a string env var, falling back to `default` when unset
pub fn env_or_default(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) => v,
        Err(_) => default.to_string(),
    }
}

/// Reads an optional string env var; blank values count as unset
pub fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads a typed env var.
///
/// Unset means `default`; a value that is set but does not parse is a
/// configuration error rather than a silent fallback.
pub fn env_parse<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("{}={:?} is invalid: {}", key, raw, e))),
        None => Ok(default),
    }
}

pub fn env_f64(key: &str, default: f64) -> AppResult<f64> {
    env_parse(key, default)
}

pub fn env_u64(key: &str, default: u64) -> AppResult<u64> {
    env_parse(key, default)
}

pub fn env_usize(key: &str, default: usize) -> AppResult<usize> {
    env_parse(key, default)
}

/// Comma separated list, blanks dropped
pub fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    match env_opt(key) {
        Some(raw) => split_list(&raw),
        None => default.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
