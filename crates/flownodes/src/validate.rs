//! Config checks shared by several definitions

use flowcore::Config;
use serde_json::Value;

/// `key` must hold a non-blank string
pub fn require_string(config: &Config, key: &str, label: &str) -> Result<(), String> {
    match config.get(key).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(format!("{} is required", label)),
    }
}

/// `key` must hold a number in `min..=max` when present
pub fn number_in_range(config: &Config, key: &str, min: f64, max: f64) -> Result<(), String> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(()),
        Some(value) => match value.as_f64() {
            Some(n) if (min..=max).contains(&n) => Ok(()),
            Some(_) => Err(format!("{} must be between {} and {}", key, min, max)),
            None => Err(format!("{} must be a number", key)),
        },
    }
}

/// `key`, when present, must be one of `allowed` (case-insensitive)
pub fn one_of(config: &Config, key: &str, allowed: &[&str]) -> Result<(), String> {
    match config.get(key).and_then(Value::as_str) {
        None => Ok(()),
        Some(value) if allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) => Ok(()),
        Some(value) => Err(format!(
            "Unsupported {} '{}', expected one of: {}",
            key,
            value,
            allowed.join(", ")
        )),
    }
}

/// Loose `user@host.tld` shape check
pub fn looks_like_email(value: &str) -> bool {
    let Some((user, host)) = value.split_once('@') else {
        return false;
    };
    !user.is_empty() && host.contains('.') && !host.starts_with('.') && !host.ends_with('.')
}
