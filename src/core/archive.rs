//! Canonical archive container
//!
//! A canonical archive is a ZIP container whose bytes are a pure function of
//! its logical `(name, content)` pairs:
//!
//! - entries are written in ascending byte-wise name order
//! - every entry carries the same synthetic timestamp and permission bits
//! - every entry is deflated at the default level
//! - only leaf files are written, never directory entries
//!
//! Two archives built from equal entry maps are byte-identical, independent of
//! insertion order, wall-clock time, or the source filesystem's metadata.

use crate::error::{PackageError, Result};
use crate::validation::validate_entry_name;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime as ZipDateTime, ZipArchive, ZipWriter};

/// Archive entry name → raw bytes, iterated in sorted order
pub type Entries = BTreeMap<String, Vec<u8>>;

/// Synthetic entry timestamp: 2025-01-01 00:00:00
pub const CANONICAL_TIMESTAMP: (u16, u8, u8, u8, u8, u8) = (2025, 1, 1, 0, 0, 0);

/// Unix permission bits stamped on every entry
pub const CANONICAL_PERMISSIONS: u32 = 0o644;

// declared entry sizes come from untrusted headers
const MAX_PREALLOCATION: u64 = 1 << 20;

fn canonical_options() -> Result<SimpleFileOptions> {
    let (year, month, day, hour, minute, second) = CANONICAL_TIMESTAMP;
    let fixed_time = ZipDateTime::from_date_and_time(year, month, day, hour, minute, second)
        .map_err(|_| {
            PackageError::Archive(zip::result::ZipError::InvalidArchive(
                "canonical timestamp out of range".into(),
            ))
        })?;

    Ok(SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(fixed_time)
        .unix_permissions(CANONICAL_PERMISSIONS))
}

/// Build a canonical archive from an entry map
///
/// Pure transformation: no filesystem access. Entry names are validated and
/// written in the map's (byte-wise) order.
///
/// # Errors
///
/// Returns `InvalidEntryName` for names that are absolute, contain empty,
/// `.` or `..` segments, or denote a directory.
pub fn build(entries: &Entries) -> Result<Vec<u8>> {
    let options = canonical_options()?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, content) in entries {
        validate_entry_name(name)?;
        zip.start_file(name.as_str(), options)?;
        zip.write_all(content)?;
    }

    let bytes = zip.finish()?.into_inner();
    debug!("Built canonical archive: {} entries, {} bytes", entries.len(), bytes.len());
    Ok(bytes)
}

/// Hex-encoded SHA-256 of arbitrary bytes
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Read every file entry of an archive into memory
///
/// Directory entries are skipped. An archive that names the same entry twice
/// is rejected, since it has no single logical content for that name.
pub fn read_entries(archive_bytes: &[u8]) -> Result<Entries> {
    let mut zip = ZipArchive::new(Cursor::new(archive_bytes))?;
    let mut entries = Entries::new();

    for index in 0..zip.len() {
        let mut file = zip.by_index(index)?;
        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        let mut content = Vec::with_capacity(file.size().min(MAX_PREALLOCATION) as usize);
        file.read_to_end(&mut content)?;

        if entries.insert(name.clone(), content).is_some() {
            return Err(PackageError::DuplicateEntry(name));
        }
    }

    debug!("Read {} entries from archive", entries.len());
    Ok(entries)
}
