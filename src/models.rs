//! Data models for batch article generation.
//!
//! This module defines the core data structures used throughout the
//! pipeline:
//! - [`GenerationRequest`]: the caller's wish list, as received
//! - [`BatchPlan`]: a validated request with a chosen [`Strategy`]
//! - [`ContentItem`]: one titled article in a batch
//! - [`Batch`]: the ordered set of items produced for one request
//! - [`RenderedDocument`]: one item rendered to PDF bytes
//! - [`PreviewResponse`]: the title/filename listing returned before any
//!   rendering cost is paid

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Batch size bounds; any supplied count is clamped into this range.
pub const MIN_COUNT: i64 = 1;
pub const MAX_COUNT: i64 = 20;

/// Default batch size for full-article generation.
pub const DEFAULT_COUNT: usize = 20;

/// Default batch size for outline-only generation.
pub const DEFAULT_OUTLINE_COUNT: usize = 5;

/// Default target word count for expanded articles.
pub const DEFAULT_WORD_LENGTH: u32 = 800;

/// Placeholder outline marking an item whose title was supplied by the
/// caller rather than generated. The expansion step recognizes it and
/// prompts from the title alone.
pub const CUSTOM_TITLE_OUTLINE: &str = "Custom title (expanded from the title alone)";

/// A batch generation request, as received from the caller.
///
/// Exactly one of instruction-driven generation and explicit titles governs
/// title production; explicit titles take precedence when non-empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerationRequest {
    /// Master instruction all generated articles follow. Required (and at
    /// least 5 characters after trimming) when `titles` is empty.
    pub instruction: Option<String>,
    /// Explicit article titles; bypasses title generation entirely.
    pub titles: Vec<String>,
    /// Requested batch size; clamped to `[1, 20]`.
    pub count: Option<i64>,
    /// Prefix prepended to every title, applied exactly once per item.
    pub modifier: Option<String>,
    /// Target word count for expanded article bodies.
    #[serde(rename = "wordLength")]
    pub word_length: Option<u32>,
}

/// How titles, outlines, and bodies are acquired for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One generation call for `count` complete items at once, with a
    /// per-item labeled-field fallback.
    DirectBatch,
    /// One generation call for `count` (title, filename, outline) triples,
    /// with a per-item fallback; bodies are filled by the expansion step.
    OutlineFirst,
    /// Caller supplied the titles; no generation call is issued for them.
    ExplicitTitles,
}

/// A validated request ready to run.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub strategy: Strategy,
    /// Trimmed master instruction; empty only for explicit titles supplied
    /// without an instruction.
    pub instruction: String,
    /// Trimmed, non-empty explicit titles (empty unless `ExplicitTitles`).
    pub titles: Vec<String>,
    /// Final batch size after clamping (or the explicit title count).
    pub count: usize,
    pub modifier: String,
    pub word_length: u32,
}

impl GenerationRequest {
    /// Validate the request and choose a strategy.
    ///
    /// `prefer_outlines` selects [`Strategy::OutlineFirst`] for
    /// instruction-driven requests (and the smaller default count that goes
    /// with it). Explicit titles always win over the flag.
    pub fn validate(&self, prefer_outlines: bool) -> Result<BatchPlan> {
        let titles: Vec<String> = self
            .titles
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let instruction = self
            .instruction
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string();

        let modifier = self.modifier.clone().unwrap_or_default();
        let word_length = self.word_length.unwrap_or(DEFAULT_WORD_LENGTH).max(1);

        if titles.is_empty() {
            if instruction.chars().count() < 5 {
                return Err(PipelineError::Validation(
                    "Please provide a longer master instruction.".into(),
                ));
            }
            let default = if prefer_outlines {
                DEFAULT_OUTLINE_COUNT
            } else {
                DEFAULT_COUNT
            };
            Ok(BatchPlan {
                strategy: if prefer_outlines {
                    Strategy::OutlineFirst
                } else {
                    Strategy::DirectBatch
                },
                instruction,
                titles,
                count: clamp_count(self.count, default),
                modifier,
                word_length,
            })
        } else {
            let count = titles.len();
            Ok(BatchPlan {
                strategy: Strategy::ExplicitTitles,
                instruction,
                titles,
                count,
                modifier,
                word_length,
            })
        }
    }
}

/// Clamp a raw count into `[1, 20]`, falling back to `default` when the
/// caller supplied none.
pub fn clamp_count(raw: Option<i64>, default: usize) -> usize {
    match raw {
        Some(n) => n.clamp(MIN_COUNT, MAX_COUNT) as usize,
        None => default,
    }
}

/// One titled content item in a batch.
///
/// Created by the content expander; `content` may be filled later by the
/// expansion step; immutable once handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Non-empty title (modifier already applied by the expander).
    pub title: String,
    /// Sanitized, batch-unique filename stem.
    pub slug: String,
    /// Short outline, when the strategy produced one.
    pub outline: Option<String>,
    /// Full body text, once acquired.
    pub content: Option<String>,
    /// 1-based position in the batch; also drives the `article_<n>`
    /// fallback naming.
    pub sequence_index: usize,
}

impl ContentItem {
    /// The archive entry name for this item.
    pub fn filename(&self) -> String {
        format!("{}.pdf", self.slug)
    }
}

/// The full ordered set of content items produced for one request.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub items: Vec<ContentItem>,
}

impl Batch {
    /// The title/filename listing callers confirm before paying for
    /// rendering.
    pub fn preview(&self) -> PreviewResponse {
        PreviewResponse {
            files: self
                .items
                .iter()
                .map(|item| PreviewFile {
                    title: item.title.clone(),
                    filename: item.filename(),
                })
                .collect(),
        }
    }
}

/// One entry of the preview listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreviewFile {
    pub title: String,
    pub filename: String,
}

/// Preview response body: `{ "files": [{ "title", "filename" }] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub files: Vec<PreviewFile>,
}

/// One rendered document, produced once per content item, never mutated.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// `slug + ".pdf"`, unique across the batch.
    pub filename: String,
    /// Opaque rendered PDF blob.
    pub bytes: Vec<u8>,
}

/// Default title for an item whose reply carried none: `Article <n>`.
/// Sanitizing it yields the `article_<n>` fallback slug.
pub fn default_title(sequence_index: usize) -> String {
    format!("Article {sequence_index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_count_bounds() {
        assert_eq!(clamp_count(Some(-5), DEFAULT_COUNT), 1);
        assert_eq!(clamp_count(Some(0), DEFAULT_COUNT), 1);
        assert_eq!(clamp_count(Some(7), DEFAULT_COUNT), 7);
        assert_eq!(clamp_count(Some(20), DEFAULT_COUNT), 20);
        assert_eq!(clamp_count(Some(1000), DEFAULT_COUNT), 20);
        assert_eq!(clamp_count(None, DEFAULT_COUNT), 20);
        assert_eq!(clamp_count(None, DEFAULT_OUTLINE_COUNT), 5);
    }

    #[test]
    fn test_validate_requires_instruction_without_titles() {
        let request = GenerationRequest::default();
        let err = request.validate(false).unwrap_err();
        assert!(err.is_client_error());

        let request = GenerationRequest {
            instruction: Some("cats".into()), // 4 chars after trim
            ..Default::default()
        };
        assert!(request.validate(false).is_err());
    }

    #[test]
    fn test_validate_instruction_driven_direct() {
        let request = GenerationRequest {
            instruction: Some("  Write about cats  ".into()),
            count: Some(3),
            ..Default::default()
        };
        let plan = request.validate(false).unwrap();
        assert_eq!(plan.strategy, Strategy::DirectBatch);
        assert_eq!(plan.instruction, "Write about cats");
        assert_eq!(plan.count, 3);
        assert_eq!(plan.word_length, DEFAULT_WORD_LENGTH);
    }

    #[test]
    fn test_validate_outline_default_count() {
        let request = GenerationRequest {
            instruction: Some("Write about cats".into()),
            ..Default::default()
        };
        let plan = request.validate(true).unwrap();
        assert_eq!(plan.strategy, Strategy::OutlineFirst);
        assert_eq!(plan.count, DEFAULT_OUTLINE_COUNT);
    }

    #[test]
    fn test_validate_explicit_titles_take_precedence() {
        let request = GenerationRequest {
            instruction: Some("Write about cats".into()),
            titles: vec!["Intro".into(), "  ".into(), "Body".into()],
            count: Some(17),
            ..Default::default()
        };
        let plan = request.validate(true).unwrap();
        assert_eq!(plan.strategy, Strategy::ExplicitTitles);
        assert_eq!(plan.titles, vec!["Intro", "Body"]);
        assert_eq!(plan.count, 2);
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let body = r#"{
            "instruction": "Write about cats",
            "count": 3,
            "modifier": "Ultimate: ",
            "wordLength": 500
        }"#;
        let request: GenerationRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.word_length, Some(500));
        assert_eq!(request.modifier.as_deref(), Some("Ultimate: "));
        assert!(request.titles.is_empty());
    }

    #[test]
    fn test_preview_shape() {
        let batch = Batch {
            items: vec![ContentItem {
                title: "Intro".into(),
                slug: "intro".into(),
                outline: None,
                content: None,
                sequence_index: 1,
            }],
        };
        let json = serde_json::to_string(&batch.preview()).unwrap();
        assert_eq!(json, r#"{"files":[{"title":"Intro","filename":"intro.pdf"}]}"#);
    }

    #[test]
    fn test_default_naming() {
        assert_eq!(default_title(3), "Article 3");
        assert_eq!(crate::slug::sanitize(&default_title(3)), "article_3");
    }
}
