//! Naming rules shared by the resolver, the executor and the results layout.

use std::path::Path;

/// Name of the per-case results directory: the case file name without its trailing extension.
///
/// ## Notes
/// - Only the last extension is stripped (`suite.tar.gz` -> `suite.tar`), so `x.py` and `x.sh` both map to `x`.
///   Callers must treat such collisions as setup errors.
/// - Dot-files keep their name (`.hidden` -> `.hidden`).
///
/// ## Examples
/// ```rust
/// use testmaster_core::case_dir_name;
///
/// assert_eq!(case_dir_name("login_test.py"), "login_test");
/// assert_eq!(case_dir_name("smoke"), "smoke");
/// ```
pub fn case_dir_name(name: &str) -> String {
    let path = Path::new(name);
    match path.file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => name.to_string(),
    }
}

/// Whether `path` ends in `.ext`, compared case-insensitively (`run.PY` matches `py`).
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext.trim_start_matches('.')))
}
