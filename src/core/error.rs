use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure class of a [`PackageError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing directory/file, missing manifest field, wrong JSON shape
    Structural,
    /// Checksum or record-count mismatch
    Integrity,
    /// Signature failure, key-id mismatch, malformed key material
    Authenticity,
    /// Refusing to overwrite published outputs
    Policy,
    /// Underlying filesystem failure
    Io,
}

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input directory not found: {}", .0.display())]
    InputDirNotFound(PathBuf),

    #[error("Required path missing: {}", .0.display())]
    RequiredPathMissing(PathBuf),

    #[error("No payload files discovered in data/ or licenses/")]
    EmptyPayload,

    #[error("Invalid archive entry name: {0}")]
    InvalidEntryName(String),

    #[error("Duplicate archive entry: {0}")]
    DuplicateEntry(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("manifest.json is missing from archive")]
    ManifestMissing,

    #[error("manifest.json must contain a JSON object")]
    ManifestNotObject,

    #[error("Invalid manifest: {0}")]
    InvalidManifest(#[source] serde_json::Error),

    #[error("Manifest is missing {0} or it is empty")]
    MissingManifestField(&'static str),

    #[error("Invalid JSON in {entry}: {source}")]
    InvalidJson {
        entry: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported JSON structure in {0}")]
    UnsupportedStructure(String),

    #[error("No records found in data/ directory")]
    NoRecords,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record count mismatch: manifest={manifest}, computed={computed}")]
    RecordCountMismatch { manifest: String, computed: u64 },

    #[error("Checksum mismatch: manifest={manifest}, computed={computed}")]
    ChecksumMismatch { manifest: String, computed: String },

    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("Invalid key material: {0}")]
    KeyMaterial(String),

    #[error("keyId mismatch: manifest={manifest}, expected={expected}")]
    KeyIdMismatch { manifest: String, expected: String },

    #[error("Refusing to overwrite existing file: {}", .0.display())]
    RefuseOverwrite(PathBuf),

    #[error("Log not found: {}", .0.display())]
    LogNotFound(PathBuf),

    #[error("Line {line}: {reason}")]
    InvalidLogEntry { line: usize, reason: String },

    #[error("Line {line}: duplicate entry for {package_id} {version}")]
    DuplicateLogEntry {
        line: usize,
        package_id: String,
        version: String,
    },
}

impl PackageError {
    /// Classify the error for reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            PackageError::Io(_) | PackageError::ReadFailed { .. } => ErrorKind::Io,
            PackageError::RecordCountMismatch { .. } | PackageError::ChecksumMismatch { .. } => {
                ErrorKind::Integrity
            }
            PackageError::SignatureInvalid(_)
            | PackageError::KeyMaterial(_)
            | PackageError::KeyIdMismatch { .. } => ErrorKind::Authenticity,
            PackageError::MissingManifestField("keyId") => ErrorKind::Authenticity,
            PackageError::RefuseOverwrite(_) => ErrorKind::Policy,
            _ => ErrorKind::Structural,
        }
    }
}

pub type Result<T> = std::result::Result<T, PackageError>;

/// Read a whole file, naming it in the error
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| PackageError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })
}
