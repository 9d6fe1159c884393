#![no_main]
use libfuzzer_sys::fuzz_target;
use obdresource::core::{archive, records};
use obdresource::ZeroRecords;

// Untrusted archive bytes must never panic the reader or the record counter
fuzz_target!(|data: &[u8]| {
    let entries = match archive::read_entries(data) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    let _ = records::count(&entries, ZeroRecords::Allow);
});
