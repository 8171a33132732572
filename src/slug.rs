//! Filename slugs: sanitization and batch-wide deduplication.

use std::collections::HashSet;

/// Fallback slug used when sanitization leaves nothing behind.
pub const FALLBACK_SLUG: &str = "article";

/// Maximum slug length in characters.
const MAX_SLUG_LEN: usize = 60;

/// Convert arbitrary text into a filesystem/URL-safe filename stem.
///
/// Lowercases the input, keeps `[a-z0-9-_.]`, collapses internal whitespace
/// runs into a single underscore, truncates to 60 characters, and falls
/// back to `"article"` if nothing survives. Deterministic and total: every
/// input, including empty or fully non-ASCII text, produces a non-empty
/// slug. Sanitizing an already-sanitized slug returns it unchanged.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize("My First Post"), "my_first_post");
/// assert_eq!(sanitize("Ünïcödé!"), "ncd");
/// assert_eq!(sanitize(""), "article");
/// ```
pub fn sanitize(name: &str) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '_' | '.')
        })
        .collect();

    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join("_");
    let truncated: String = collapsed.chars().take(MAX_SLUG_LEN).collect();

    if truncated.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        truncated
    }
}

/// Turn a sequence of candidate slugs into guaranteed-unique slugs.
///
/// Preserves length and order. The first occurrence of a base slug keeps
/// the unsuffixed name; later duplicates get the smallest free `_2`, `_3`,
/// … suffix. Deterministic given the same input order.
pub fn dedupe(candidates: &[String]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(candidates.len());
    let mut unique = Vec::with_capacity(candidates.len());

    for base in candidates {
        let name = if used.insert(base.clone()) {
            base.clone()
        } else {
            let mut suffix = 2usize;
            loop {
                let variant = format!("{base}_{suffix}");
                if used.insert(variant.clone()) {
                    break variant;
                }
                suffix += 1;
            }
        };
        unique.push(name);
    }

    unique
}
