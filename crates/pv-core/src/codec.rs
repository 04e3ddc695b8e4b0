//! Line codec for `Param("KEY", ...)` declarations

use regex::Regex;
use std::sync::LazyLock;

/// Matches a declaration at the start of a line (after indentation) and
/// captures the quoted key. No escape processing is done on the key.
static PARAM_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*Param\s*\(\s*"([^"]+)""#).expect("param line pattern is valid")
});

/// Extract the parameter key from a line, if the line is a declaration
///
/// Comments, braces, blank lines and anything else that is not a
/// `Param(...)` call yield `None`.
pub fn extract_key(line: &str) -> Option<&str> {
    PARAM_LINE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
