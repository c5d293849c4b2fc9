#![no_main]

use libfuzzer_sys::fuzz_target;
use testmaster_core::{case_dir_name, parse_manifest};

fuzz_target!(|data: &[u8]| {
    // Convert bytes to UTF-8 string (ignore invalid UTF-8)
    if let Ok(s) = std::str::from_utf8(data) {
        for name in parse_manifest(s) {
            assert!(!name.is_empty());
            assert!(!name.starts_with('#'));
            let _ = case_dir_name(&name);
        }
    }
});
