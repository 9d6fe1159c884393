#![no_main]
use libfuzzer_sys::fuzz_target;
use obdresource::Manifest;

fuzz_target!(|data: &[u8]| {
    let manifest = match Manifest::from_slice(data) {
        Ok(m) => m,
        Err(_) => return,
    };

    // canonical form is a fixed point
    let once = manifest.to_canonical_bytes().unwrap();
    let twice = Manifest::from_slice(&once)
        .unwrap()
        .to_canonical_bytes()
        .unwrap();
    assert_eq!(once, twice);
});
