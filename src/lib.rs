//! # obdresource - Signed, Reproducible Diagnostic Resource Packages
//!
//! `obdresource` packages a directory of diagnostic data exports and license
//! attributions into a tamper-evident `.obdresource` archive, and verifies such
//! archives against a detached Ed25519 signature and the integrity metadata
//! embedded in their manifest.
//!
//! - **Canonical archives**: sorted entries, fixed timestamps and permissions,
//!   byte-identical output for identical logical content
//! - **Self-binding checksum**: the manifest's `checksum` covers the archive
//!   including the manifest itself (hashed with a blank checksum)
//! - **Authoritative record count** recomputed from `data/*.json`
//! - **Append-only signing log** for downstream audit
//!
//! ## Input layout
//!
//! ```text
//! work/
//! ├── manifest.json      packageId, version, pass-through metadata
//! ├── data/              JSON exports, counted towards `records`
//! └── licenses/          attribution files, content-agnostic
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use obdresource::{SignRequest, VerifyRequest, Result};
//!
//! # fn main() -> Result<()> {
//! let signed = SignRequest::new("work", "keys/private.pem", "dist/dtc.obdresource")
//!     .key_id("primary")
//!     .sign()?;
//!
//! let report = VerifyRequest::new(
//!     &signed.archive_path,
//!     &signed.signature_path,
//!     "keys/public.pem",
//! )
//! .expected_key_id("primary")
//! .verify()?;
//!
//! println!("Records: {}", report.records);
//! # Ok(())
//! # }
//! ```

pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use crate::core::{
    archive, audit, canonical, error, keys, manifest, payload, records, signer, validation,
    verifier,
};

pub use crate::core::{
    archive::Entries,
    audit::{check_log, CheckOptions, SigningLog, SigningLogEntry, DEFAULT_LOG_PATH},
    canonical::{canonicalize, Canonicalized},
    error::{ErrorKind, PackageError, Result},
    manifest::Manifest,
    records::ZeroRecords,
    signer::{default_signature_path, SignRequest, SignedPackage, DEFAULT_KEY_ID},
    verifier::{verify_bytes, VerifyReport, VerifyRequest},
};
