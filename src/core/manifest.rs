//! Resource package manifest
//!
//! The manifest binds package metadata to the archive contents through the
//! `checksum` field. Fields the packaging protocol depends on are typed;
//! everything else is carried through untouched in [`Manifest::extra`].
//!
//! # Canonical encoding
//!
//! [`Manifest::to_canonical_bytes`] renders UTF-8 JSON with keys sorted at
//! every level, two-space indentation, no trailing newline and no ASCII
//! escaping of non-ASCII text. Semantically equal manifests always encode to
//! identical bytes.

use crate::error::{PackageError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Fields the signer computes itself; upstream values are discarded
pub const SIGNER_FIELDS: [&str; 3] = ["checksum", "keyId", "records"];

/// Resource package manifest
///
/// # Examples
///
/// ```
/// use obdresource::Manifest;
///
/// let manifest = Manifest::new("dtc-ford", "2025.01")
///     .with_key_id("primary")
///     .with_extra("title", serde_json::json!("Ford DTC definitions"));
///
/// let bytes = manifest.to_canonical_bytes().unwrap();
/// assert!(bytes.starts_with(b"{\n  \"keyId\""));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Package identifier, e.g. "dtc-ford"
    #[serde(rename = "packageId", default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,

    /// Package version string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Identifier of the signing key, always overwritten on sign
    #[serde(rename = "keyId", default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,

    /// Creation time, `YYYY-MM-DDTHH:MM:SSZ`
    ///
    /// Set once when absent, never overwritten on resign.
    #[serde(rename = "createdAtUtc", default, skip_serializing_if = "Option::is_none")]
    pub created_at_utc: Option<String>,

    /// Authoritative record count derived from the payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<u64>,

    /// Hex SHA-256 of the canonical archive built with a blank checksum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// Unrecognized fields, passed through unchanged
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Manifest {
    /// Manifest file name, in the input directory and inside the archive
    pub const PATH: &'static str = crate::validation::MANIFEST_ENTRY;

    /// Create a manifest with the identifying fields set
    pub fn new(package_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package_id: Some(package_id.into()),
            version: Some(version.into()),
            ..Self::default()
        }
    }

    /// Parse a manifest document
    ///
    /// # Errors
    ///
    /// - `InvalidManifest` if the bytes are not JSON
    /// - `ManifestNotObject` if the top-level value is not an object
    /// - `InvalidManifest` if a known field has the wrong type
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_document(parse_document(bytes)?)
    }

    /// Parse an upstream manifest ahead of signing
    ///
    /// `checksum`, `keyId` and `records` are dropped before decoding, whatever
    /// their type, since the signer recomputes all three.
    pub fn from_upstream(bytes: &[u8]) -> Result<Self> {
        let mut document = parse_document(bytes)?;
        for field in SIGNER_FIELDS {
            if let Some(value) = document.remove(field) {
                debug!("Discarding upstream {}: {}", field, value);
            }
        }
        Self::from_document(document)
    }

    fn from_document(document: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(document)).map_err(PackageError::InvalidManifest)
    }

    /// Encode with sorted keys and stable indentation
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>> {
        canonical_json(&serde_json::to_value(self)?)
    }

    /// Copy of this manifest with `checksum` forced to the empty string
    pub fn with_blank_checksum(&self) -> Self {
        Self {
            checksum: Some(String::new()),
            ..self.clone()
        }
    }

    /// Non-empty `packageId`, if any
    pub fn package_id(&self) -> Option<&str> {
        non_empty(&self.package_id)
    }

    /// Non-empty `version`, if any
    pub fn version(&self) -> Option<&str> {
        non_empty(&self.version)
    }

    /// Non-empty `keyId`, if any
    pub fn key_id(&self) -> Option<&str> {
        non_empty(&self.key_id)
    }

    /// Set key id
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// Set creation timestamp
    pub fn with_created_at(mut self, created_at_utc: impl Into<String>) -> Self {
        self.created_at_utc = Some(created_at_utc.into());
        self
    }

    /// Add a pass-through field
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Parse manifest bytes as a JSON object without interpreting any field
///
/// # Errors
///
/// - `InvalidManifest` if the bytes are not JSON
/// - `ManifestNotObject` if the top-level value is not an object
pub fn parse_document(bytes: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice(bytes).map_err(PackageError::InvalidManifest)? {
        Value::Object(document) => Ok(document),
        _ => Err(PackageError::ManifestNotObject),
    }
}

/// Canonical encoding of any JSON value, as used for manifests
pub fn canonical_json(value: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&sort_keys(value.clone()))?)
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Rebuild every object with keys in byte-wise order
///
/// Known and pass-through fields interleave, so the order cannot come from
/// the struct declaration.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(ordered.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
