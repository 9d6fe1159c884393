//! Ed25519 key material
//!
//! Keys are accepted in two encodings, tried in this order:
//!
//! 1. raw key bytes: a 32-byte private seed or a 32-byte public key
//! 2. PEM: PKCS#8 `PRIVATE KEY` or SPKI `PUBLIC KEY`
//!
//! A PEM document holding a key of any other algorithm is rejected.

use crate::error::{read_file, PackageError, Result};
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey};
use ed25519_dalek::{
    Signature, Signer, SigningKey, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH,
    SIGNATURE_LENGTH,
};
use std::path::Path;
use tracing::debug;

/// Decode a private signing key from raw or PEM bytes
pub fn decode_signing_key(data: &[u8]) -> Result<SigningKey> {
    if let Ok(seed) = <[u8; SECRET_KEY_LENGTH]>::try_from(data) {
        debug!("Decoded raw Ed25519 private key");
        return Ok(SigningKey::from_bytes(&seed));
    }

    let pem = pem_text(data)?;
    SigningKey::from_pkcs8_pem(pem).map_err(|e| {
        PackageError::KeyMaterial(format!("Provided key is not an Ed25519 private key: {e}"))
    })
}

/// Decode a public verifying key from raw or PEM bytes
pub fn decode_verifying_key(data: &[u8]) -> Result<VerifyingKey> {
    if let Ok(raw) = <[u8; PUBLIC_KEY_LENGTH]>::try_from(data) {
        debug!("Decoded raw Ed25519 public key");
        return VerifyingKey::from_bytes(&raw)
            .map_err(|e| PackageError::KeyMaterial(format!("invalid Ed25519 public key: {e}")));
    }

    let pem = pem_text(data)?;
    VerifyingKey::from_public_key_pem(pem).map_err(|e| {
        PackageError::KeyMaterial(format!("Provided key is not an Ed25519 public key: {e}"))
    })
}

/// Load a private signing key from a file
pub fn load_signing_key(path: &Path) -> Result<SigningKey> {
    decode_signing_key(&read_file(path)?)
}

/// Load a public verifying key from a file
pub fn load_verifying_key(path: &Path) -> Result<VerifyingKey> {
    decode_verifying_key(&read_file(path)?)
}

fn pem_text(data: &[u8]) -> Result<&str> {
    let text = std::str::from_utf8(data).map_err(|_| {
        PackageError::KeyMaterial(format!(
            "expected {} raw key bytes or a PEM document, got {} bytes of binary data",
            SECRET_KEY_LENGTH,
            data.len()
        ))
    })?;
    Ok(text.trim())
}

/// Produce a detached signature over `message`
pub fn sign(key: &SigningKey, message: &[u8]) -> Vec<u8> {
    key.sign(message).to_bytes().to_vec()
}

/// Check a detached signature over `message`
///
/// # Errors
///
/// Returns `SignatureInvalid` when the signature has the wrong length or does
/// not verify under `key`.
pub fn verify(key: &VerifyingKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let signature = Signature::from_slice(signature).map_err(|_| {
        PackageError::SignatureInvalid(format!(
            "signature must be {} bytes, got {}",
            SIGNATURE_LENGTH,
            signature.len()
        ))
    })?;

    key.verify(message, &signature)
        .map_err(|_| PackageError::SignatureInvalid("ed25519 verification failed".to_string()))
}
