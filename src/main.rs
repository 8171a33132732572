//! # Article Bundler
//!
//! A generation-to-archive pipeline that turns one natural-language
//! instruction (or a list of explicit titles) into a batch of distinct
//! long-form articles and packages them into a single downloadable zip of
//! PDFs.
//!
//! ## Usage
//!
//! ```sh
//! article_bundler -i "Write about cats" -c 3 -o cats.zip
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Validation**: clamp the batch size and pick a strategy
//! 2. **Expansion**: acquire titles/outlines/bodies from the generation
//!    service (bounded-concurrency worker pool, structured-output parsing
//!    with fallbacks, batch-unique filenames)
//! 3. **Rendering**: one paginated PDF per article
//! 4. **Archiving**: stream every document into one zip container
//!
//! Errors before the archive opens are reported as `{"error": "..."}` on
//! stderr with exit status 2 for bad input and 1 for service-side
//! failures; a failure mid-stream leaves a truncated archive behind, in
//! which case the whole request should be retried.

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod archive;
mod cli;
mod config;
mod error;
mod expand;
mod models;
mod parse;
mod pipeline;
mod render;
mod slug;
mod utils;

use api::ChatClient;
use cli::Cli;
use config::GeneratorConfig;
use error::{ErrorResponse, PipelineError, Result};
use models::GenerationRequest;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    debug!(?args.output, preview = args.preview, "Parsed CLI arguments");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "pipeline failed");
            let body = serde_json::json!(ErrorResponse::from(&e));
            eprintln!("{body}");
            if e.is_client_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(args: Cli) -> Result<()> {
    let start_time = std::time::Instant::now();
    info!("article_bundler starting up");

    let request = build_request(&args).await?;
    let plan = request.validate(args.outlines)?;
    info!(
        strategy = ?plan.strategy,
        count = plan.count,
        word_length = plan.word_length,
        "request validated"
    );

    let config = GeneratorConfig::load(args.config.as_deref()).await?;
    let api_key = config.resolve_api_key(args.api_key.clone())?;
    let client = ChatClient::new(&config, api_key)?;

    if args.preview {
        let preview = pipeline::preview(&client, &plan, config.concurrency).await?;
        let listing = serde_json::to_string_pretty(&preview)
            .map_err(|e| PipelineError::Io(std::io::Error::other(e)))?;
        println!("{listing}");
        info!(files = preview.files.len(), "preview complete");
    } else {
        if let Some(parent) = Path::new(&args.output).parent() {
            let parent = parent.to_string_lossy();
            if !parent.is_empty() {
                ensure_writable_dir(&parent).await?;
            }
        }

        let sink = File::create(&args.output)?;
        let (sink, entries) = pipeline::bundle(&client, &plan, config.concurrency, sink).await?;
        sink.sync_all()?;
        info!(path = %args.output, entries, "archive written");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Assemble the request from a JSON body file or from individual flags.
async fn build_request(args: &Cli) -> Result<GenerationRequest> {
    if let Some(path) = &args.request {
        let raw = tokio::fs::read_to_string(path).await?;
        let request: GenerationRequest = serde_json::from_str(&raw).map_err(|e| {
            PipelineError::Validation(format!("could not parse request body {path}: {e}"))
        })?;
        return Ok(request);
    }

    Ok(GenerationRequest {
        instruction: args.instruction.clone(),
        titles: args.titles.clone(),
        count: args.count,
        modifier: args.modifier.clone(),
        word_length: args.word_length,
    })
}
