//! Signing audit trail
//!
//! Every successful sign operation appends one JSON object per line to an
//! append-only log (default `logs/signing.log`):
//! - keys sorted, UTF-8, no embedded newlines
//! - the whole line, terminator included, goes out in a single append write
//!   so concurrent or interrupted writers never interleave partial lines
//!
//! [`check_log`] validates a log against the schema downstream consumers
//! rely on.

mod check;

pub use check::{check_log, CheckOptions};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default signing log location, relative to the working directory
pub const DEFAULT_LOG_PATH: &str = "logs/signing.log";

/// Single signing log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningLogEntry {
    /// Absolute path of the written archive
    pub archive: String,
    /// Hex SHA-256 recorded in the manifest
    pub checksum: String,
    /// Identifier of the signing key
    pub key_id: String,
    /// Absolute path of the updated manifest file
    pub manifest: String,
    pub package_id: String,
    pub records: u64,
    /// Absolute path of the detached signature
    pub signature: String,
    /// Time of signing, `YYYY-MM-DDTHH:MM:SSZ`
    pub timestamp: String,
    pub version: String,
}

impl SigningLogEntry {
    /// Render as a single newline-terminated JSON line
    pub fn to_line(&self) -> Result<Vec<u8>> {
        // fields are declared in key order, so the object comes out sorted
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Append-only writer for the signing log
#[derive(Debug, Clone)]
pub struct SigningLog {
    path: PathBuf,
}

impl SigningLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SigningLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating the log and its parent directory if needed
    pub fn append(&self, entry: &SigningLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let line = entry.to_line()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        file.flush()?;

        info!(
            "Appended signing log entry for {} {} to {}",
            entry.package_id,
            entry.version,
            self.path.display()
        );
        Ok(())
    }
}

impl Default for SigningLog {
    fn default() -> Self {
        SigningLog::new(DEFAULT_LOG_PATH)
    }
}
