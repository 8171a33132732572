//! Utility functions for logging, JSON truncation detection, and file
//! system checks.

use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::Result;

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte
/// count indicator appended. Truncation happens on a character boundary so
/// non-ASCII generator replies stay printable.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When a generator reply is cut off (e.g., due to token limits), the
/// resulting JSON fails to parse with an EOF error. This helps decide
/// whether a single re-ask is worth attempting before falling back to the
/// per-item strategy.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<()> {
    fs::create_dir_all(path).await?;
    // Small sync probe write; simpler error surface than an async handle.
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    let probe = stdfs::File::create(&probe_path)?;
    drop(probe);
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    type JsonResult<T> = std::result::Result<T, serde_json::Error>;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte_boundary() {
        let s = "héllo wörld, this is a long reply";
        let result = truncate_for_log(s, 2);
        // Must not split the two-byte 'é'.
        assert!(result.starts_with('h'));
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#; // missing closing brace
        let result: JsonResult<serde_json::Value> = serde_json::from_str(json_eof);
        if let Err(e) = result {
            assert!(looks_truncated(&e));
        }
    }

    #[test]
    fn test_looks_truncated_other_errors() {
        let bad_syntax = r#"{"field": nope}"#;
        let result: JsonResult<serde_json::Value> = serde_json::from_str(bad_syntax);
        if let Err(e) = result {
            assert!(!looks_truncated(&e));
        }
    }
}
