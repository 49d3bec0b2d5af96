//! Include directive recognition and line markers.
//!
//! The scan is line oriented, not a lexer: a directive inside a block comment
//! still matches. Delimiters are not paired, so `"file>` and `<file"` are
//! accepted along with the usual spellings.

use regex::Regex;
use std::sync::OnceLock;

const INCLUDE_PATTERN: &str = r#"^\s*#\s*include\s+["<](.*)[">].*$"#;

static INCLUDE_REGEX: OnceLock<Regex> = OnceLock::new();

fn include_regex() -> &'static Regex {
    INCLUDE_REGEX.get_or_init(|| Regex::new(INCLUDE_PATTERN).expect("invalid include pattern"))
}

/// Return the requested path if `line` is an include directive.
pub fn parse_include(line: &str) -> Option<&str> {
    include_regex()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Marker telling the downstream compiler that the next line is `line` of the
/// including file.
pub fn line_marker(line: usize) -> String {
    format!("#line {line}")
}
