//! Packaging core: archive construction, manifest sealing, signing and
//! verification.

pub mod archive;
pub mod audit;
pub mod canonical;
pub mod error;
pub mod keys;
pub mod manifest;
pub mod payload;
pub mod records;
pub mod signer;
pub mod validation;
pub mod verifier;
