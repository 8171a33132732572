//! Render one content item into a paginated PDF document.
//!
//! The generated bodies are markdown-ish: block-level headings, paragraphs,
//! and bulleted lists. The renderer converts those blocks into a small HTML
//! document (complex CSS and layouts are avoided on purpose; the PDF
//! backend supports only a simple subset) and lets the PDF engine paginate
//! it. Missing or malformed body text never fails a render: an empty body
//! produces a title-only document. The only failure mode is the PDF engine
//! itself refusing to produce output, which is fatal for that item.

use std::collections::BTreeMap;
use std::io::Cursor;

use printpdf::{GeneratePdfOptions, PdfDocument};
use tracing::{debug, instrument, warn};

use crate::error::{PipelineError, Result};
use crate::models::{ContentItem, RenderedDocument};

/// One block-level element of a content body.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    /// Heading with level 1-6.
    Heading(u8, String),
    Paragraph(String),
    List(Vec<String>),
}

/// Render one content item to PDF bytes, named after its slug.
#[instrument(level = "info", skip_all, fields(slug = %item.slug))]
pub fn render_document(item: &ContentItem) -> Result<RenderedDocument> {
    let bytes = render_pdf(&item.title, item.content.as_deref().unwrap_or_default())?;
    debug!(bytes = bytes.len(), "rendered document");
    Ok(RenderedDocument {
        filename: item.filename(),
        bytes,
    })
}

/// Render a title and body into a paginated PDF blob.
pub fn render_pdf(title: &str, content: &str) -> Result<Vec<u8>> {
    let html = document_html(title, &parse_blocks(content));
    let mut warnings = Vec::new();

    let doc = PdfDocument::from_html(
        &html,
        &BTreeMap::new(), // images
        &BTreeMap::new(), // fonts
        &GeneratePdfOptions::default(),
        &mut warnings,
    )
    .map_err(|e| PipelineError::Render(format!("failed to lay out '{title}': {e}")))?;

    if !warnings.is_empty() {
        debug!(count = warnings.len(), "PDF generation produced warnings");
    }

    let uncompressed = doc.save(&Default::default(), &mut warnings);

    Ok(compress_streams(title, uncompressed))
}

/// Compress PDF streams to reduce file size.
///
/// Post-processing step needed because the PDF engine emits uncompressed
/// content streams. A failed compression pass keeps the uncompressed
/// bytes; it never fails the render.
fn compress_streams(title: &str, uncompressed: Vec<u8>) -> Vec<u8> {
    let mut doc = match lopdf::Document::load_mem(&uncompressed) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(%title, error = %e, "could not reparse PDF for compression; keeping uncompressed bytes");
            return uncompressed;
        }
    };

    doc.compress();

    let mut output = Cursor::new(Vec::new());
    match doc.save_to(&mut output) {
        Ok(()) => output.into_inner(),
        Err(e) => {
            warn!(%title, error = %e, "could not save compressed PDF; keeping uncompressed bytes");
            uncompressed
        }
    }
}

/// Split a markdown-ish body into block-level elements.
///
/// Recognized markers: `#`-prefixed headings, `-`/`*` bullets (consecutive
/// bullets group into one list), and blank-line paragraph breaks. Text with
/// no recognized markers becomes a single paragraph.
fn parse_blocks(content: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();
    let mut list: Vec<String> = Vec::new();

    fn flush_paragraph(paragraph: &mut Vec<String>, blocks: &mut Vec<Block>) {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    }
    fn flush_list(list: &mut Vec<String>, blocks: &mut Vec<Block>) {
        if !list.is_empty() {
            blocks.push(Block::List(std::mem::take(list)));
        }
    }

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_list(&mut list, &mut blocks);
            continue;
        }

        if let Some(heading) = heading_of(trimmed) {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_list(&mut list, &mut blocks);
            blocks.push(heading);
            continue;
        }

        if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            flush_paragraph(&mut paragraph, &mut blocks);
            list.push(item.trim().to_string());
            continue;
        }

        flush_list(&mut list, &mut blocks);
        paragraph.push(trimmed.to_string());
    }

    flush_paragraph(&mut paragraph, &mut blocks);
    flush_list(&mut list, &mut blocks);
    blocks
}

fn heading_of(line: &str) -> Option<Block> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = line[hashes..].trim();
    if rest.is_empty() {
        return None;
    }
    Some(Block::Heading(hashes as u8, rest.to_string()))
}

/// Build the HTML document the PDF engine lays out.
///
/// The title is a centered block at a larger size; headings shrink with
/// their level; list items are indented and bulleted by the engine's
/// default `ul` styling.
fn document_html(title: &str, blocks: &[Block]) -> String {
    let mut html = String::new();
    html.push_str(
        "<!DOCTYPE html><html><head><style>\
         body { font-family: sans-serif; font-size: 12px; } \
         h1.doc-title { font-size: 20px; text-align: center; }\
         </style></head><body>",
    );
    html.push_str(&format!(
        "<h1 class=\"doc-title\">{}</h1>",
        escape_html(title)
    ));

    for block in blocks {
        match block {
            Block::Heading(level, text) => {
                // Body headings start one level below the document title.
                let tag = (level + 1).min(6);
                html.push_str(&format!("<h{tag}>{}</h{tag}>", escape_html(text)));
            }
            Block::Paragraph(text) => {
                html.push_str(&format!("<p>{}</p>", escape_html(text)));
            }
            Block::List(items) => {
                html.push_str("<ul>");
                for item in items {
                    html.push_str(&format!("<li>{}</li>", escape_html(item)));
                }
                html.push_str("</ul>");
            }
        }
    }

    html.push_str("</body></html>");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blocks_plain_text_single_paragraph() {
        let blocks = parse_blocks("Just one line of text.");
        assert_eq!(
            blocks,
            vec![Block::Paragraph("Just one line of text.".into())]
        );
    }

    #[test]
    fn test_parse_blocks_joins_wrapped_lines() {
        let blocks = parse_blocks("First line\nsecond line.\n\nNew paragraph.");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph("First line second line.".into()),
                Block::Paragraph("New paragraph.".into()),
            ]
        );
    }

    #[test]
    fn test_parse_blocks_headings_and_lists() {
        let content = "# Top\nIntro text.\n## Sub\n- one\n- two\n* three\nTail.";
        let blocks = parse_blocks(content);
        assert_eq!(
            blocks,
            vec![
                Block::Heading(1, "Top".into()),
                Block::Paragraph("Intro text.".into()),
                Block::Heading(2, "Sub".into()),
                Block::List(vec!["one".into(), "two".into(), "three".into()]),
                Block::Paragraph("Tail.".into()),
            ]
        );
    }

    #[test]
    fn test_parse_blocks_empty_body() {
        assert!(parse_blocks("").is_empty());
        assert!(parse_blocks("\n\n  \n").is_empty());
    }

    #[test]
    fn test_parse_blocks_hash_without_text_is_prose() {
        let blocks = parse_blocks("#######\ntext");
        // Seven hashes is not a heading; the line folds into the paragraph.
        assert_eq!(blocks, vec![Block::Paragraph("####### text".into())]);
    }

    #[test]
    fn test_document_html_escapes_and_centers_title() {
        let html = document_html("Cats & <Dogs>", &[Block::Paragraph("a > b".into())]);
        assert!(html.contains("<h1 class=\"doc-title\">Cats &amp; &lt;Dogs&gt;</h1>"));
        assert!(html.contains("<p>a &gt; b</p>"));
        assert!(html.contains("text-align: center"));
    }

    #[test]
    fn test_document_html_heading_levels_shift_down() {
        let html = document_html(
            "T",
            &[Block::Heading(1, "A".into()), Block::Heading(6, "B".into())],
        );
        assert!(html.contains("<h2>A</h2>"));
        // Level 6 clamps at h6.
        assert!(html.contains("<h6>B</h6>"));
    }

    #[test]
    fn test_document_html_title_only() {
        let html = document_html("Solo", &[]);
        assert!(html.contains("Solo"));
        assert!(html.ends_with("</body></html>"));
    }
}
