//! Best-effort recovery of typed article records from generator replies.
//!
//! The generation service is not contractually guaranteed to produce
//! well-formed output, so every reply is treated as untrusted text. Two
//! recovery modes are provided:
//!
//! - **Labeled-field mode** ([`parse_labeled`]): scans for case-insensitive
//!   `TITLE:`, `FILENAME:`, and `CONTENT:`/`OUTLINE:` markers. Total: it
//!   always produces a record, substituting a caller-supplied default title
//!   and a slug derived from the title when markers are missing.
//! - **JSON mode** ([`parse_json_records`]): strips a fenced block if one
//!   is present, then attempts a strict parse into a list of records (or an
//!   object holding a list under a known key). Parse failure is an explicit
//!   "no result" (`None`), never an error, so callers can fall back to
//!   labeled-field mode or a per-item retry strategy.
//!
//! Neither mode panics on malformed input, and both are Unicode-safe.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::slug;
use crate::utils::looks_truncated;

/// One article record recovered from a labeled-field reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArticle {
    /// Human-friendly title, or the caller-supplied default.
    pub title: String,
    /// Sanitized filename stem derived from `FILENAME:` or the title.
    pub file_base: String,
    /// Greedy remainder after `CONTENT:`/`OUTLINE:`, or the whole reply.
    pub body: String,
}

/// One record from a JSON-mode reply. All fields are optional because the
/// generator frequently omits or renames them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub outline: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)TITLE:[ \t]*(.*)").unwrap());
static FILENAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)FILENAME:[ \t]*(.*)").unwrap());
static BODY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)(?:CONTENT|OUTLINE):\s*(.*)").unwrap());
static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap());

/// Object keys under which JSON-mode replies are allowed to nest the list.
const LIST_KEYS: &[&str] = &["articles", "files", "items"];

/// Recover a `(title, file_base, body)` record from a labeled-field reply.
///
/// Fields may appear in any order and may be preceded by extraneous prose;
/// the first match of each marker wins. `CONTENT:` (or `OUTLINE:`) greedily
/// consumes the remainder of the text. A missing `TITLE:` yields
/// `default_title`; a missing `FILENAME:` derives the stem from the title
/// via the sanitizer; a missing body marker yields the whole reply.
pub fn parse_labeled(reply: &str, default_title: &str) -> ParsedArticle {
    let title = TITLE_RE
        .captures(reply)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| default_title.to_string());

    let file_candidate = FILENAME_RE
        .captures(reply)
        .map(|c| c[1].trim().to_string())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| title.clone());

    let body = BODY_RE
        .captures(reply)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| reply.trim().to_string());

    ParsedArticle {
        file_base: slug::sanitize(&file_candidate),
        title,
        body,
    }
}

/// Attempt to recover a list of records from a JSON-mode reply.
///
/// Tries, in order: the contents of the first fenced block, the trimmed
/// reply itself, and the outermost `[` … `]` span (which tolerates leading
/// prose and trailing commentary around an embedded array). Returns `None`
/// when no candidate yields a non-empty list.
pub fn parse_json_records(reply: &str) -> Option<Vec<JsonRecord>> {
    for candidate in candidate_payloads(reply) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            if let Some(records) = records_from_value(value) {
                if !records.is_empty() {
                    return Some(records);
                }
            }
        }
    }
    None
}

/// True when a JSON-mode reply fails to parse specifically because the
/// text is cut off mid-document. Used to decide whether one re-ask is
/// worth attempting before giving up on JSON mode.
pub fn truncation_suspected(reply: &str) -> bool {
    let candidates = candidate_payloads(reply);
    let Some(best) = candidates.first() else {
        return false;
    };
    match serde_json::from_str::<Value>(best) {
        Ok(_) => false,
        Err(e) => looks_truncated(&e),
    }
}

fn candidate_payloads(reply: &str) -> Vec<&str> {
    let trimmed = reply.trim();
    let mut candidates = Vec::new();

    if let Some(fenced) = FENCE_RE.captures(trimmed) {
        if let Some(inner) = fenced.get(1) {
            candidates.push(inner.as_str());
        }
    }
    candidates.push(trimmed);
    if let (Some(start), Some(end)) = (trimmed.find('['), trimmed.rfind(']')) {
        if start < end {
            candidates.push(&trimmed[start..=end]);
        }
    }

    candidates
}

fn records_from_value(value: Value) -> Option<Vec<JsonRecord>> {
    match value {
        Value::Array(elements) => {
            let records: Vec<JsonRecord> = elements
                .into_iter()
                .filter_map(|el| serde_json::from_value::<JsonRecord>(el).ok())
                .collect();
            Some(records)
        }
        Value::Object(mut map) => {
            for key in LIST_KEYS {
                if let Some(list @ Value::Array(_)) = map.remove(*key) {
                    return records_from_value(list);
                }
            }
            None
        }
        _ => None,
    }
}
