//! Suite manifest text format.
//!
//! A manifest is a text file with one test-case file name per line. Blank lines and lines whose first
//! non-whitespace character is `#` are ignored. Every other line, trimmed, is a test-case name. Order and
//! duplicates are preserved.

/// Parse manifest text into the ordered list of test-case names.
///
/// ## Examples
/// ```rust
/// use testmaster_core::parse_manifest;
///
/// let names = parse_manifest("# sample\na.py\n\nb.sh\n");
/// assert_eq!(names, vec!["a.py", "b.sh"]);
/// ```
pub fn parse_manifest(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
