//! Record counting over `data/*.json` payload entries
//!
//! A JSON entry contributes:
//! - its length, when the top-level value is an array
//! - the length of the first of `records`, `items`, `entries` that holds an
//!   array, when the top-level value is an object
//!
//! Any other shape is an unsupported-structure error naming the entry.

use crate::archive::Entries;
use crate::error::{PackageError, Result};
use crate::validation::is_data_json;
use serde_json::Value;

/// Object keys searched for a record array, in priority order
pub const RECORD_KEYS: [&str; 3] = ["records", "items", "entries"];

/// Whether a total of zero records is acceptable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroRecords {
    /// Signing path: a package must contain data
    Reject,
    /// Verification path: zero is compared like any other value
    Allow,
}

/// Count records in a single decoded JSON document
fn count_document(entry: &str, document: &Value) -> Result<u64> {
    match document {
        Value::Array(items) => Ok(items.len() as u64),
        Value::Object(map) => RECORD_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(|items| items.len() as u64)
            .ok_or_else(|| PackageError::UnsupportedStructure(entry.to_string())),
        _ => Err(PackageError::UnsupportedStructure(entry.to_string())),
    }
}

/// Count the records across all `data/*.json` entries of a payload
///
/// Entries outside `data/` and non-JSON files are ignored.
///
/// # Errors
///
/// - `InvalidJson` if an inspected entry does not parse
/// - `UnsupportedStructure` if an entry has no countable shape
/// - `NoRecords` if the total is zero and `zero` is [`ZeroRecords::Reject`]
pub fn count(payload: &Entries, zero: ZeroRecords) -> Result<u64> {
    let mut total = 0u64;

    for (name, blob) in payload.iter().filter(|(name, _)| is_data_json(name)) {
        let document: Value =
            serde_json::from_slice(blob).map_err(|source| PackageError::InvalidJson {
                entry: name.clone(),
                source,
            })?;
        total += count_document(name, &document)?;
    }

    if total == 0 && zero == ZeroRecords::Reject {
        return Err(PackageError::NoRecords);
    }

    Ok(total)
}
