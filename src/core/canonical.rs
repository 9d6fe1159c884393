//! Manifest canonicalization and the two-phase checksum
//!
//! The checksum has to cover the manifest's own content, but the checksum
//! field cannot contain its own value. The manifest is therefore hashed with
//! a blank checksum, then the digest is filled in and the archive rebuilt:
//!
//! ```text
//! payload ∪ {manifest.json: manifest{checksum: ""}}   → build → SHA-256 = checksum
//! payload ∪ {manifest.json: manifest{checksum: hex}}  → build → final archive (signed)
//! ```
//!
//! A verifier repeats the first line from the archive's own entries and
//! compares digests.

use crate::archive::{self, Entries};
use crate::error::{PackageError, Result};
use crate::manifest::{canonical_json, Manifest};
use crate::records::{self, ZeroRecords};
use crate::validation::{utc_timestamp_now, MANIFEST_ENTRY};
use serde_json::{Map, Value};
use tracing::debug;

/// Output of [`canonicalize`]
#[derive(Debug, Clone)]
pub struct Canonicalized {
    /// Manifest with `checksum` filled in
    pub manifest: Manifest,
    /// Canonical manifest bytes with a blank checksum
    pub for_hash_bytes: Vec<u8>,
    /// Canonical manifest bytes embedded in the final archive
    pub manifest_bytes: Vec<u8>,
    /// Final archive bytes, the artifact that gets signed
    pub archive: Vec<u8>,
    /// Hex SHA-256 binding manifest metadata to archive contents
    pub checksum: String,
}

/// Apply the signer's manifest updates
///
/// - `keyId` is always overwritten with `key_id`
/// - `createdAtUtc` is set to the current time only when absent or empty
/// - `records` is recomputed from the payload, ignoring any upstream value
///
/// # Errors
///
/// Propagates record counting errors, including `NoRecords` for a payload
/// without data.
pub fn prepare(mut manifest: Manifest, payload: &Entries, key_id: &str) -> Result<Manifest> {
    manifest.key_id = Some(key_id.to_string());

    if manifest.created_at_utc.as_deref().map_or(true, str::is_empty) {
        manifest.created_at_utc = Some(utc_timestamp_now());
    }

    let counted = records::count(payload, ZeroRecords::Reject)?;
    if let Some(declared) = manifest.records.filter(|declared| *declared != counted) {
        debug!("Replacing upstream record count {} with {}", declared, counted);
    }
    manifest.records = Some(counted);

    Ok(manifest)
}

/// Compute the checksum of `payload` bound to `manifest`
///
/// The manifest's own `checksum` value is ignored: it is blanked before
/// encoding. Any `manifest.json` already present in `payload` is replaced.
///
/// Returns the blank-checksum manifest bytes and the hex digest.
pub fn checksum(manifest: &Manifest, payload: &Entries) -> Result<(Vec<u8>, String)> {
    match serde_json::to_value(manifest)? {
        Value::Object(document) => document_checksum(&document, payload),
        _ => Err(PackageError::ManifestNotObject),
    }
}

/// [`checksum`] over an uninterpreted manifest document
///
/// Used by verification, where the embedded manifest's fields may have any
/// JSON type.
pub fn document_checksum(
    document: &Map<String, Value>,
    payload: &Entries,
) -> Result<(Vec<u8>, String)> {
    let mut blank = document.clone();
    blank.insert("checksum".to_string(), Value::String(String::new()));
    let for_hash_bytes = canonical_json(&Value::Object(blank))?;

    let mut contents = payload.clone();
    contents.insert(MANIFEST_ENTRY.to_string(), for_hash_bytes.clone());

    let digest = archive::sha256_hex(&archive::build(&contents)?);
    Ok((for_hash_bytes, digest))
}

/// Run both phases: hash with a blank checksum, then embed the digest
///
/// Pure: the input manifest is not modified and nothing touches the
/// filesystem.
pub fn canonicalize(manifest: &Manifest, payload: &Entries) -> Result<Canonicalized> {
    let (for_hash_bytes, checksum) = checksum(manifest, payload)?;

    let mut manifest = manifest.clone();
    manifest.checksum = Some(checksum.clone());
    let manifest_bytes = manifest.to_canonical_bytes()?;

    let mut contents = payload.clone();
    contents.insert(MANIFEST_ENTRY.to_string(), manifest_bytes.clone());
    let archive = archive::build(&contents)?;

    debug!("Canonicalized manifest, checksum {}", checksum);

    Ok(Canonicalized {
        manifest,
        for_hash_bytes,
        manifest_bytes,
        archive,
        checksum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::is_valid_timestamp;

    fn payload() -> Entries {
        let mut entries = Entries::new();
        entries.insert("data/dtc_FORD.json".into(), br#"[{"code":"P0420"}]"#.to_vec());
        entries.insert("licenses/LICENSE.txt".into(), b"attribution".to_vec());
        entries
    }

    #[test]
    fn test_prepare_overwrites_key_and_records() -> Result<()> {
        let mut upstream = Manifest::new("dtc-ford", "1").with_key_id("old");
        upstream.records = Some(999);

        let prepared = prepare(upstream, &payload(), "primary")?;
        assert_eq!(prepared.key_id(), Some("primary"));
        assert_eq!(prepared.records, Some(1));
        Ok(())
    }

    #[test]
    fn test_prepare_keeps_created_at() -> Result<()> {
        let upstream = Manifest::new("x", "1").with_created_at("2024-06-01T12:00:00Z");
        let prepared = prepare(upstream, &payload(), "primary")?;
        assert_eq!(prepared.created_at_utc.as_deref(), Some("2024-06-01T12:00:00Z"));
        Ok(())
    }

    #[test]
    fn test_prepare_defaults_created_at() -> Result<()> {
        for upstream in [Manifest::new("x", "1"), Manifest::new("x", "1").with_created_at("")] {
            let prepared = prepare(upstream, &payload(), "primary")?;
            let created = prepared.created_at_utc.unwrap();
            assert!(is_valid_timestamp(&created), "bad timestamp {}", created);
        }
        Ok(())
    }

    #[test]
    fn test_prepare_rejects_empty_data() {
        let mut entries = payload();
        entries.insert("data/dtc_FORD.json".into(), b"[]".to_vec());
        assert!(matches!(
            prepare(Manifest::new("x", "1"), &entries, "primary"),
            Err(PackageError::NoRecords)
        ));
    }

    #[test]
    fn test_checksum_embedded_and_recomputable() -> Result<()> {
        let manifest = prepare(Manifest::new("x", "1"), &payload(), "primary")?;
        let sealed = canonicalize(&manifest, &payload())?;

        assert_eq!(sealed.checksum.len(), 64);
        assert_eq!(sealed.manifest.checksum.as_deref(), Some(sealed.checksum.as_str()));

        // the final archive embeds exactly the final manifest bytes
        let entries = archive::read_entries(&sealed.archive)?;
        assert_eq!(entries[MANIFEST_ENTRY], sealed.manifest_bytes);

        // recomputing from the final archive's entries gives the same digest
        let embedded = Manifest::from_slice(&entries[MANIFEST_ENTRY])?;
        let (for_hash, recomputed) = checksum(&embedded, &entries)?;
        assert_eq!(recomputed, sealed.checksum);
        assert_eq!(for_hash, sealed.for_hash_bytes);

        Ok(())
    }

    #[test]
    fn test_for_hash_bytes_have_blank_checksum() -> Result<()> {
        let manifest = prepare(Manifest::new("x", "1"), &payload(), "primary")?;
        let sealed = canonicalize(&manifest, &payload())?;
        let for_hash = Manifest::from_slice(&sealed.for_hash_bytes)?;
        assert_eq!(for_hash.checksum.as_deref(), Some(""));
        Ok(())
    }

    #[test]
    fn test_canonicalize_is_deterministic() -> Result<()> {
        let mut manifest = Manifest::new("x", "1")
            .with_key_id("primary")
            .with_created_at("2025-01-01T00:00:00Z");
        manifest.records = Some(1);

        let first = canonicalize(&manifest, &payload())?;
        let second = canonicalize(&manifest, &payload())?;
        assert_eq!(first.archive, second.archive);
        assert_eq!(first.checksum, second.checksum);
        Ok(())
    }

    #[test]
    fn test_stale_checksum_does_not_affect_digest() -> Result<()> {
        let manifest = prepare(Manifest::new("x", "1"), &payload(), "primary")?;
        let mut stale = manifest.clone();
        stale.checksum = Some("0".repeat(64));

        assert_eq!(
            checksum(&manifest, &payload())?.1,
            checksum(&stale, &payload())?.1
        );
        Ok(())
    }
}
