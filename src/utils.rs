//! Small helpers shared across the pipeline.
//!
//! - Whitespace normalization for extracted article text
//! - Filesystem-safe directory names for per-country output
//! - UTC timestamps in the `...Z` form used by every persisted record
//! - Log-friendly truncation and output directory probing

use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

static RE_HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static RE_BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static RE_UNSAFE_DIR_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static RE_WS_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Current UTC time as ISO-8601 with microseconds and a `Z` suffix.
///
/// ```ignore
/// assert!(utc_now_iso().ends_with('Z'));
/// ```
pub fn utc_now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Normalize extracted text.
///
/// Line endings become `\n`, runs of spaces/tabs collapse to one space, three
/// or more newlines collapse to a blank line, and the result is trimmed.
/// Returns `None` when nothing is left.
pub fn normalize_whitespace(value: &str) -> Option<String> {
    let text = value.replace("\r\n", "\n").replace('\r', "\n");
    let text = RE_HSPACE.replace_all(&text, " ");
    let text = RE_BLANK_RUNS.replace_all(&text, "\n\n");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Turn a country label into a directory name.
///
/// Keeps word characters, whitespace and `-`, then joins whitespace runs with
/// `-`. Falls back to `"unknown"` when nothing usable remains.
///
/// ```ignore
/// assert_eq!(safe_dir_name("United Kingdom"), "United-Kingdom");
/// assert_eq!(safe_dir_name("???"), "unknown");
/// ```
pub fn safe_dir_name(value: &str) -> String {
    let stripped = RE_UNSAFE_DIR_CHARS.replace_all(value, "");
    let joined = RE_WS_RUNS.replace_all(stripped.trim(), "-");
    if joined.is_empty() {
        "unknown".to_string()
    } else {
        joined.into_owned()
    }
}

/// Truncate a string for logging.
///
/// Cuts on a char boundary at or below `max` bytes and appends
/// `"…(+N bytes)"` with the number of bytes dropped.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn ensure_writable_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)?;
    let probe_path = path.join("..__probe_write__");
    fs::File::create(&probe_path)?;
    let _ = fs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // 'é' is two bytes; cutting at 1 would split it
        let result = truncate_for_log("éé", 1);
        assert_eq!(result, "…(+4 bytes)");
    }

    #[test]
    fn test_normalize_whitespace() {
        let raw = "  First\t\t line   here\r\n\r\n\r\n\r\nSecond\rline  ";
        assert_eq!(
            normalize_whitespace(raw).as_deref(),
            Some("First line here\n\nSecond\nline")
        );
    }

    #[test]
    fn test_normalize_whitespace_empty() {
        assert_eq!(normalize_whitespace(""), None);
        assert_eq!(normalize_whitespace(" \t\n\n "), None);
    }

    #[test]
    fn test_safe_dir_name() {
        assert_eq!(safe_dir_name("United Kingdom"), "United-Kingdom");
        assert_eq!(safe_dir_name("  Côte d'Ivoire "), "Côte-dIvoire");
        assert_eq!(safe_dir_name("U.S.A."), "USA");
        assert_eq!(safe_dir_name("???"), "unknown");
        assert_eq!(safe_dir_name(""), "unknown");
    }

    #[test]
    fn test_utc_now_iso_has_z_suffix() {
        let now = utc_now_iso();
        assert!(now.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&now).is_ok());
    }

    #[test]
    fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        ensure_writable_dir(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
