#![no_main]

use libfuzzer_sys::fuzz_target;
use relevo::loader::{read_records, LogSnapshot};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes, including invalid UTF-8, must only ever skip lines
    let _ = read_records(data, "fuzz");

    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(snapshot) = LogSnapshot::from_strs(input, input) {
            let _ = snapshot.len();
        }
    }
});
