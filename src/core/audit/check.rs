//! Signing log validation
//!
//! Checks, per non-blank line:
//! - the line is a JSON object
//! - all nine fields are present with the expected JSON types
//! - `records` is an integer (a float is accepted only if integral)
//! - `timestamp` matches `YYYY-MM-DDTHH:MM:SSZ`
//! - `archive`, `signature`, `manifest` exist on disk (optional)
//!
//! and across lines that `(packageId, version)` pairs are unique (optional).

use crate::error::{PackageError, Result};
use crate::validation::is_valid_timestamp;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

const STRING_FIELDS: [&str; 8] = [
    "archive",
    "checksum",
    "keyId",
    "manifest",
    "packageId",
    "signature",
    "timestamp",
    "version",
];

const PATH_FIELDS: [&str; 3] = ["archive", "signature", "manifest"];

/// Validation switches for [`check_log`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Accept repeated `(packageId, version)` pairs
    pub allow_duplicates: bool,
    /// Require referenced archive/signature/manifest paths to exist
    pub check_paths: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            allow_duplicates: false,
            check_paths: true,
        }
    }
}

/// Validate a signing log, returning the number of entries checked
///
/// Stops at the first offending line.
pub fn check_log(path: &Path, options: CheckOptions) -> Result<usize> {
    if !path.exists() {
        return Err(PackageError::LogNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut validated = 0;

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(raw).map_err(|e| PackageError::InvalidLogEntry {
            line,
            reason: format!("invalid JSON ({e})"),
        })?;
        let entry = value.as_object().ok_or_else(|| PackageError::InvalidLogEntry {
            line,
            reason: "entry is not a JSON object".to_string(),
        })?;

        let key = validate_entry(entry, line, options.check_paths)?;

        if !options.allow_duplicates && seen.contains(&key) {
            return Err(PackageError::DuplicateLogEntry {
                line,
                package_id: key.0,
                version: key.1,
            });
        }
        seen.insert(key);
        validated += 1;
    }

    debug!("Validated {} signing entries from {}", validated, path.display());
    Ok(validated)
}

fn validate_entry(
    entry: &Map<String, Value>,
    line: usize,
    check_paths: bool,
) -> Result<(String, String)> {
    let invalid = |reason: String| PackageError::InvalidLogEntry { line, reason };

    for field in STRING_FIELDS {
        match entry.get(field) {
            None => return Err(invalid(format!("missing field {field}"))),
            Some(Value::String(_)) => {}
            Some(other) => {
                return Err(invalid(format!(
                    "field {field} has unexpected type {}",
                    type_name(other)
                )))
            }
        }
    }

    match entry.get("records") {
        None => return Err(invalid("missing field records".to_string())),
        Some(Value::Number(n)) => {
            let integral = n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0);
            if !integral {
                return Err(invalid(format!("records must be integer-like (got {n})")));
            }
        }
        Some(other) => {
            return Err(invalid(format!(
                "field records has unexpected type {}",
                type_name(other)
            )))
        }
    }

    let text = |field: &str| entry[field].as_str().unwrap_or_default().to_string();

    let timestamp = text("timestamp");
    if !is_valid_timestamp(&timestamp) {
        return Err(invalid(format!("Invalid timestamp format: {timestamp:?}")));
    }

    if check_paths {
        for field in PATH_FIELDS {
            let path = text(field);
            if !Path::new(&path).exists() {
                return Err(invalid(format!("{field} path does not exist: {path}")));
            }
        }
    }

    Ok((text("packageId"), text("version")))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
