//! The generation-to-archive pipeline.
//!
//! One configurable flow replaces a family of near-duplicate request
//! handlers: validate → expand (strategy-dependent) → either a
//! title/filename preview or render-and-append into a streamed archive.
//!
//! Ordering is fixed end to end: items are generated, rendered, and
//! appended in the order their titles were produced, because filenames
//! were deduplicated against exactly that order.
//!
//! Failure policy: any generation, render, or append failure aborts the
//! whole batch. Generation happens before the archive is opened, so
//! generation failures still produce a clean structured error; render and
//! append failures abandon the partially-streamed archive (see
//! [`crate::archive`]).

use std::io::{Seek, Write};

use tracing::{error, info, instrument};

use crate::api::Generate;
use crate::error::Result;
use crate::expand::Expander;
use crate::models::{BatchPlan, PreviewResponse};
use crate::render;
use crate::archive::ArchiveStreamer;

/// Produce the title/filename preview for a plan without rendering
/// anything.
#[instrument(level = "info", skip_all)]
pub async fn preview<G: Generate>(
    client: &G,
    plan: &BatchPlan,
    concurrency: usize,
) -> Result<PreviewResponse> {
    let expander = Expander::new(client, concurrency);
    let batch = expander.expand(plan).await?;
    Ok(batch.preview())
}

/// Run the full pipeline: expand the batch, render every item, and stream
/// the archive into `sink`. Returns the sink and the number of entries
/// written.
#[instrument(level = "info", skip_all)]
pub async fn bundle<G: Generate, W: Write + Seek>(
    client: &G,
    plan: &BatchPlan,
    concurrency: usize,
    sink: W,
) -> Result<(W, usize)> {
    let expander = Expander::new(client, concurrency);

    let mut batch = expander.expand(plan).await?;
    expander.fill_bodies(plan, &mut batch).await?;

    let mut archive = ArchiveStreamer::open(sink);
    for item in &batch.items {
        let document = match render::render_document(item) {
            Ok(document) => document,
            Err(e) => {
                error!(slug = %item.slug, error = %e, "render failed; abandoning archive");
                archive.abort();
                return Err(e);
            }
        };
        archive.append(&document)?;
    }

    let sink = archive.finalize()?;
    let entries = archive.entries();
    info!(entries, "archive streamed");
    Ok((sink, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Prompt, SamplingOptions};
    use crate::error::PipelineError;
    use crate::models::GenerationRequest;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<VecDeque<String>>,
    }

    impl Scripted {
        fn new(replies: &[&str]) -> Self {
            Scripted {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            }
        }
    }

    impl Generate for Scripted {
        async fn generate(&self, _prompt: &Prompt, _options: &SamplingOptions) -> Result<String> {
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_preview_lists_distinct_filenames() {
        let reply = r#"[
            {"title": "Cats", "filename": "cats", "content": "One."},
            {"title": "Cats Again", "filename": "cats", "content": "Two."},
            {"title": "More Cats", "filename": "cats", "content": "Three."}
        ]"#;
        let client = Scripted::new(&[reply]);
        let plan = GenerationRequest {
            instruction: Some("Write about cats".into()),
            count: Some(3),
            ..Default::default()
        }
        .validate(false)
        .unwrap();

        let preview = preview(&client, &plan, 4).await.unwrap();
        let names: Vec<&str> = preview.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["cats.pdf", "cats_2.pdf", "cats_3.pdf"]);
    }

    #[tokio::test]
    async fn test_preview_explicit_titles_without_generation() {
        let client = Scripted::new(&[]);
        let plan = GenerationRequest {
            titles: vec!["Intro".into(), "Intro".into()],
            ..Default::default()
        }
        .validate(false)
        .unwrap();

        let preview = preview(&client, &plan, 4).await.unwrap();
        assert_eq!(preview.files.len(), 2);
        assert_eq!(preview.files[0].filename, "intro.pdf");
        assert_eq!(preview.files[1].filename, "intro_2.pdf");
    }

    #[tokio::test]
    async fn test_generation_failure_reported_before_any_streaming() {
        struct AlwaysFails;
        impl Generate for AlwaysFails {
            async fn generate(
                &self,
                _prompt: &Prompt,
                _options: &SamplingOptions,
            ) -> Result<String> {
                Err(PipelineError::Generation("service down".into()))
            }
        }

        let sink = std::io::Cursor::new(Vec::new());
        let plan = GenerationRequest {
            instruction: Some("Write about cats".into()),
            count: Some(1),
            ..Default::default()
        }
        .validate(false)
        .unwrap();

        let err = bundle(&AlwaysFails, &plan, 1, sink).await.unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
    }
}
