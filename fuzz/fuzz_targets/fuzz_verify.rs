#![no_main]
use ed25519_dalek::SigningKey;
use libfuzzer_sys::fuzz_target;
use obdresource::core::keys;
use obdresource::verify_bytes;

// Signs whatever the fuzzer produces so the checks past the signature get exercised
fuzz_target!(|data: &[u8]| {
    let key = SigningKey::from_bytes(&[42u8; 32]);
    let signature = keys::sign(&key, data);

    let _ = verify_bytes(data, &signature, &key.verifying_key(), None);
});
