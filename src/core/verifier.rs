//! Package verification
//!
//! Checks run in order and stop at the first failure; each assumes the
//! structure established by the ones before it:
//!
//! | Step | Check                                             | Failure class |
//! |------|---------------------------------------------------|---------------|
//! | a    | Ed25519 signature over the raw archive bytes      | authenticity  |
//! | b    | `manifest.json` present and a JSON object         | structural    |
//! | c    | `keyId` a non-empty string equal to expected id   | authenticity  |
//! | d    | recomputed record count equals `records`          | integrity     |
//! | e    | recomputed checksum equals `checksum`             | integrity     |
//!
//! The embedded manifest stays an untyped JSON object: a field of the wrong
//! type fails the step that owns it, not the structural check.

use crate::archive::{self, Entries};
use crate::canonical;
use crate::error::{read_file, PackageError, Result};
use crate::keys;
use crate::manifest;
use crate::records::{self, ZeroRecords};
use crate::validation::MANIFEST_ENTRY;
use ed25519_dalek::VerifyingKey;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, info};

/// Diagnostics of a fully verified package
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    pub package_id: Option<String>,
    pub version: Option<String>,
    /// Record count recomputed from the archive's data entries
    pub records: u64,
    pub key_id: String,
    pub checksum: String,
}

/// Inputs of a verify operation
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    archive_path: PathBuf,
    signature_path: PathBuf,
    public_key_path: PathBuf,
    expected_key_id: Option<String>,
}

impl VerifyRequest {
    pub fn new(
        archive_path: impl Into<PathBuf>,
        signature_path: impl Into<PathBuf>,
        public_key_path: impl Into<PathBuf>,
    ) -> Self {
        VerifyRequest {
            archive_path: archive_path.into(),
            signature_path: signature_path.into(),
            public_key_path: public_key_path.into(),
            expected_key_id: None,
        }
    }

    /// Require the manifest's `keyId` to equal `key_id`
    pub fn expected_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.expected_key_id = Some(key_id.into());
        self
    }

    /// Read the three inputs from disk and verify
    pub fn verify(&self) -> Result<VerifyReport> {
        let archive_bytes = read_file(&self.archive_path)?;
        let signature = read_file(&self.signature_path)?;
        let public_key = keys::load_verifying_key(&self.public_key_path)?;

        let report = verify_bytes(
            &archive_bytes,
            &signature,
            &public_key,
            self.expected_key_id.as_deref(),
        );
        match &report {
            Ok(report) => info!(
                "Verified {} ({} records)",
                self.archive_path.display(),
                report.records
            ),
            Err(e) => debug!("Verification of {} failed: {}", self.archive_path.display(), e),
        }
        report
    }
}

/// Verify in-memory archive bytes against a detached signature
pub fn verify_bytes(
    archive_bytes: &[u8],
    signature: &[u8],
    public_key: &VerifyingKey,
    expected_key_id: Option<&str>,
) -> Result<VerifyReport> {
    // (a)
    keys::verify(public_key, archive_bytes, signature)?;
    debug!("Signature OK");

    // (b)
    let entries = archive::read_entries(archive_bytes)?;
    let manifest = embedded_manifest(&entries)?;

    // (c)
    let key_id = check_key_id(&manifest, expected_key_id)?;

    // (d)
    let records = check_records(&manifest, &entries)?;

    // (e)
    let checksum = check_checksum(&manifest, &entries)?;

    Ok(VerifyReport {
        package_id: text_field(&manifest, "packageId"),
        version: text_field(&manifest, "version"),
        records,
        key_id,
        checksum,
    })
}

/// Step (b): extract `manifest.json` as a JSON object
pub fn embedded_manifest(entries: &Entries) -> Result<Map<String, Value>> {
    let bytes = entries
        .get(MANIFEST_ENTRY)
        .ok_or(PackageError::ManifestMissing)?;
    manifest::parse_document(bytes)
}

/// Step (c): `keyId` a non-empty string, and as expected
pub fn check_key_id(manifest: &Map<String, Value>, expected: Option<&str>) -> Result<String> {
    let key_id =
        text_field(manifest, "keyId").ok_or(PackageError::MissingManifestField("keyId"))?;

    if let Some(expected) = expected.filter(|e| !e.is_empty()) {
        if key_id != expected {
            return Err(PackageError::KeyIdMismatch {
                manifest: key_id,
                expected: expected.to_string(),
            });
        }
    }
    Ok(key_id)
}

/// Step (d): recomputed record count equals the declared one
///
/// Compared by numeric value, so an integral float such as `3.0` matches 3.
pub fn check_records(manifest: &Map<String, Value>, entries: &Entries) -> Result<u64> {
    let computed = records::count(entries, ZeroRecords::Allow)?;
    let declared = manifest.get("records");

    let matches = match declared {
        Some(Value::Number(n)) => {
            n.as_u64() == Some(computed) || (n.is_f64() && n.as_f64() == Some(computed as f64))
        }
        _ => false,
    };
    if !matches {
        return Err(PackageError::RecordCountMismatch {
            manifest: render(declared),
            computed,
        });
    }
    Ok(computed)
}

/// Step (e): recomputed checksum equals the declared one
pub fn check_checksum(manifest: &Map<String, Value>, entries: &Entries) -> Result<String> {
    let (_, computed) = canonical::document_checksum(manifest, entries)?;
    let declared = manifest.get("checksum");
    if declared.and_then(Value::as_str) != Some(computed.as_str()) {
        return Err(PackageError::ChecksumMismatch {
            manifest: render(declared),
            computed,
        });
    }
    Ok(computed)
}

fn text_field(manifest: &Map<String, Value>, field: &str) -> Option<String> {
    manifest
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Declared value as shown in mismatch diagnostics
fn render(value: Option<&Value>) -> String {
    match value {
        None => "<missing>".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
