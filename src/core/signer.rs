//! Package signing
//!
//! Workflow:
//! ```text
//! input/manifest.json ─┐
//! input/data/**       ─┼→ prepare → canonicalize → sign ─→ archive, manifest, signature
//! input/licenses/**   ─┘                                 └→ signing log entry
//! ```
//!
//! All computation (payload collection, record counting, both archive builds,
//! key loading, signing) happens before the first byte is written, so a
//! failing run leaves no output behind. Outputs are written through a
//! temporary sibling file and renamed into place.

use crate::audit::{SigningLog, SigningLogEntry, DEFAULT_LOG_PATH};
use crate::canonical;
use crate::error::{read_file, PackageError, Result};
use crate::keys;
use crate::manifest::Manifest;
use crate::payload;
use crate::validation::{utc_timestamp_now, DATA_DIR, LICENSES_DIR, MANIFEST_ENTRY};
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Key id embedded when none is given
pub const DEFAULT_KEY_ID: &str = "primary";

/// Extension appended to the archive path for the default signature path
pub const SIGNATURE_SUFFIX: &str = ".sig";

/// Outcome of a successful sign operation
#[derive(Debug, Clone)]
pub struct SignedPackage {
    /// Absolute archive path
    pub archive_path: PathBuf,
    /// Absolute signature path
    pub signature_path: PathBuf,
    /// Absolute path of the rewritten manifest
    pub manifest_path: PathBuf,
    /// Final manifest, identical to the copy inside the archive
    pub manifest: Manifest,
    /// Log entry that was appended
    pub log_entry: SigningLogEntry,
}

/// Builder for a sign operation
///
/// # Examples
///
/// ```rust,no_run
/// use obdresource::SignRequest;
///
/// # fn main() -> obdresource::Result<()> {
/// let signed = SignRequest::new("work/ford", "keys/signing.pem", "dist/ford.obdresource")
///     .key_id("release-2025")
///     .log_path("logs/signing.log")
///     .sign()?;
///
/// println!("checksum {}", signed.manifest.checksum.unwrap_or_default());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SignRequest {
    input_dir: PathBuf,
    key_path: PathBuf,
    output_path: PathBuf,
    signature_path: Option<PathBuf>,
    key_id: String,
    force: bool,
    log_path: PathBuf,
}

impl SignRequest {
    /// Create a request with default key id, no overwrite and default log
    pub fn new(
        input_dir: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        SignRequest {
            input_dir: input_dir.into(),
            key_path: key_path.into(),
            output_path: output_path.into(),
            signature_path: None,
            key_id: DEFAULT_KEY_ID.to_string(),
            force: false,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }

    /// Set the signature path (defaults to `<output>.sig`)
    pub fn signature_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.signature_path = Some(path.into());
        self
    }

    /// Set the key id embedded in the manifest
    pub fn key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = key_id.into();
        self
    }

    /// Allow replacing an existing archive and signature
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set the signing log path
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    /// Run the sign operation
    ///
    /// # Errors
    ///
    /// - structural: missing input paths, manifest problems, empty payload,
    ///   unsupported data shapes, zero records
    /// - authenticity: unreadable or non-Ed25519 key material
    /// - policy: `RefuseOverwrite` when an output exists and `force` is off
    pub fn sign(self) -> Result<SignedPackage> {
        if self.key_id.is_empty() {
            return Err(PackageError::MissingManifestField("keyId"));
        }

        let input_dir = absolutize(&self.input_dir)?;
        if !input_dir.exists() {
            return Err(PackageError::InputDirNotFound(input_dir));
        }

        let manifest_path = input_dir.join(MANIFEST_ENTRY);
        for required in [
            manifest_path.clone(),
            input_dir.join(DATA_DIR),
            input_dir.join(LICENSES_DIR),
        ] {
            if !required.exists() {
                return Err(PackageError::RequiredPathMissing(required));
            }
        }

        let upstream = Manifest::from_upstream(&read_file(&manifest_path)?)?;
        let payload = payload::collect(&input_dir)?;
        if payload.is_empty() {
            return Err(PackageError::EmptyPayload);
        }
        debug!("Collected {} payload files", payload.len());

        let prepared = canonical::prepare(upstream, &payload, &self.key_id)?;
        let package_id = prepared
            .package_id()
            .ok_or(PackageError::MissingManifestField("packageId"))?
            .to_string();
        let version = prepared
            .version()
            .ok_or(PackageError::MissingManifestField("version"))?
            .to_string();

        let sealed = canonical::canonicalize(&prepared, &payload)?;

        let archive_path = absolutize(&self.output_path)?;
        let signature_path = match &self.signature_path {
            Some(path) => absolutize(path)?,
            None => default_signature_path(&archive_path),
        };

        if !self.force {
            for target in [&archive_path, &signature_path] {
                if target.exists() {
                    return Err(PackageError::RefuseOverwrite(target.clone()));
                }
            }
        }

        let signing_key = keys::load_signing_key(&self.key_path)?;
        let signature = keys::sign(&signing_key, &sealed.archive);

        write_atomic(&archive_path, &sealed.archive)?;
        write_atomic(&manifest_path, &sealed.manifest_bytes)?;
        write_atomic(&signature_path, &signature)?;

        info!(
            "Signed {} {} ({} records) into {}",
            package_id,
            version,
            sealed.manifest.records.unwrap_or_default(),
            archive_path.display()
        );

        let log_entry = SigningLogEntry {
            archive: archive_path.display().to_string(),
            checksum: sealed.checksum.clone(),
            key_id: self.key_id.clone(),
            manifest: manifest_path.display().to_string(),
            package_id,
            records: sealed.manifest.records.unwrap_or_default(),
            signature: signature_path.display().to_string(),
            timestamp: utc_timestamp_now(),
            version,
        };
        SigningLog::new(absolutize(&self.log_path)?).append(&log_entry)?;

        Ok(SignedPackage {
            archive_path,
            signature_path,
            manifest_path,
            manifest: sealed.manifest,
            log_entry,
        })
    }
}

/// `<archive>.sig` next to the archive
pub fn default_signature_path(archive_path: &Path) -> PathBuf {
    let mut name = OsString::from(archive_path.as_os_str());
    name.push(SIGNATURE_SUFFIX);
    PathBuf::from(name)
}

/// Write through a temporary sibling file, then rename over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, bytes)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Absolute, lexically normalized form of `path`
fn absolutize(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}
