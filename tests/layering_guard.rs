//! Layering guardrails to keep `testmaster_core` free of IO and async runtimes.
//!
//! Front ends depend on the core vocabulary without pulling in the engine. This test scans the core crate's
//! `Cargo.toml` and fails if anything other than `serde` and `thiserror` appears in `[dependencies]`.

const ALLOWED: &[&str] = &["serde", "thiserror"];

#[test]
fn core_depends_only_on_serde_and_thiserror() {
    let manifest = include_str!("../crates/testmaster_core/Cargo.toml");
    let mut in_dependencies = false;

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        // Track when we enter/exit the `[dependencies]` table.
        if line.starts_with('[') {
            if line == "[dependencies]" {
                in_dependencies = true;
                continue;
            }
            if in_dependencies {
                break;
            }
        }

        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }

        let name = line.split(['=', ' ']).next().unwrap_or("").trim();
        assert!(
            ALLOWED.contains(&name),
            "`{name}` must not appear in testmaster_core [dependencies]; the core crate does no IO"
        );
    }
}

#[test]
fn core_sources_do_not_touch_the_filesystem_or_processes() {
    let sources = [
        include_str!("../crates/testmaster_core/src/errors.rs"),
        include_str!("../crates/testmaster_core/src/manifest.rs"),
        include_str!("../crates/testmaster_core/src/naming.rs"),
        include_str!("../crates/testmaster_core/src/outcome.rs"),
        include_str!("../crates/testmaster_core/src/state.rs"),
    ];
    for source in sources {
        for forbidden in ["std::fs", "std::process", "tokio"] {
            assert!(!source.contains(forbidden), "core source uses `{forbidden}`");
        }
    }
}
