#![no_main]

use libfuzzer_sys::fuzz_target;
use testmaster::config::{EngineConfig, parse_config};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let values = parse_config(s);
        // Invalid values are errors, never panics
        let _ = EngineConfig::default().apply(&values);
    }
});
