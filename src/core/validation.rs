//! Validation for archive entry names and timestamps
//!
//! Entry names are POSIX-style relative paths namespaced under `data/` or
//! `licenses/`, plus the single top-level `manifest.json`. Timestamps in the
//! manifest and the signing log use second precision UTC: `YYYY-MM-DDTHH:MM:SSZ`.

use crate::error::{PackageError, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Name of the manifest entry inside the archive and in the input directory
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Payload namespace holding JSON data exports
pub const DATA_DIR: &str = "data";

/// Payload namespace holding attribution files
pub const LICENSES_DIR: &str = "licenses";

/// strftime layout of every timestamp this crate writes
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const CHECKSUM_PATTERN: &str = r"^[0-9a-f]{64}$";

/// Current UTC time truncated to whole seconds, `YYYY-MM-DDTHH:MM:SSZ`
pub fn utc_timestamp_now() -> String {
    format_timestamp(Utc::now())
}

/// Render a UTC time in the canonical timestamp layout
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Check a timestamp string matches `YYYY-MM-DDTHH:MM:SSZ` exactly
pub fn is_valid_timestamp(value: &str) -> bool {
    // chrono accepts unpadded fields, so pin the length as well
    value.len() == 20 && NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).is_ok()
}

/// Check a string is a lowercase hex SHA-256 digest
pub fn is_valid_checksum(value: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CHECKSUM_PATTERN).expect("static pattern compiles"))
        .is_match(value)
}

/// True if any `/`-separated segment starts with a dot
pub fn is_hidden_path(name: &str) -> bool {
    name.split('/').any(|segment| segment.starts_with('.'))
}

/// Validate an archive entry name
///
/// # Rules
/// - Non-empty, relative, forward slashes only
/// - No empty, `.` or `..` segments
/// - No trailing slash (directory entries are never written)
pub fn validate_entry_name(name: &str) -> Result<()> {
    let invalid = || PackageError::InvalidEntryName(name.to_string());

    if name.is_empty() || name.starts_with('/') || name.ends_with('/') || name.contains('\\') {
        return Err(invalid());
    }

    if name
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(invalid());
    }

    Ok(())
}

/// True for entries the record counter inspects (`data/**.json`)
pub fn is_data_json(name: &str) -> bool {
    name.starts_with("data/") && name.ends_with(".json")
}
