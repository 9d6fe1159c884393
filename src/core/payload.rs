//! Payload collection from an input directory
//!
//! Files under `data/` and `licenses/` are gathered recursively into an
//! [`Entries`] map keyed by POSIX-style archive names (`data/…`,
//! `licenses/…`). Any path segment beginning with `.` excludes the file.

use crate::archive::Entries;
use crate::error::{read_file, PackageError, Result};
use crate::validation::{is_hidden_path, validate_entry_name, DATA_DIR, LICENSES_DIR};
use std::path::{Component, Path};
use tracing::debug;
use walkdir::WalkDir;

/// Collect every non-hidden file below `root/subdir`
///
/// A missing directory yields an empty map.
pub fn collect_dir(root: &Path, subdir: &str) -> Result<Entries> {
    let folder = root.join(subdir);
    let mut entries = Entries::new();
    if !folder.exists() {
        return Ok(entries);
    }

    let walker = WalkDir::new(&folder)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
        });

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(&folder)
            .map_err(|_| PackageError::InvalidEntryName(entry.path().display().to_string()))?;
        let name = archive_name(subdir, relative)?;

        if is_hidden_path(&name) {
            continue;
        }
        validate_entry_name(&name)?;

        entries.insert(name, read_file(entry.path())?);
    }

    debug!("Collected {} files from {}", entries.len(), folder.display());
    Ok(entries)
}

/// Collect the full signing payload: `data/` and `licenses/`
pub fn collect(root: &Path) -> Result<Entries> {
    let mut payload = collect_dir(root, DATA_DIR)?;
    payload.extend(collect_dir(root, LICENSES_DIR)?);
    Ok(payload)
}

/// Join `subdir` and a relative path with forward slashes
fn archive_name(subdir: &str, relative: &Path) -> Result<String> {
    let mut name = subdir.to_string();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment.to_str().ok_or_else(|| {
                    PackageError::InvalidEntryName(relative.to_string_lossy().into_owned())
                })?;
                name.push('/');
                name.push_str(segment);
            }
            _ => {
                return Err(PackageError::InvalidEntryName(
                    relative.to_string_lossy().into_owned(),
                ))
            }
        }
    }
    Ok(name)
}
