//! Generation-service interaction with exponential backoff retry logic.
//!
//! This module is the boundary to the external text generator: an
//! OpenAI-compatible chat completions API. Every reply is plain text that
//! the caller must treat as untrusted (see [`crate::parse`]).
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`Generate`]: core trait defining one async generation call
//! - [`ChatClient`]: implementation over `reqwest` for the chat
//!   completions wire format
//! - [`RetryGenerate`]: decorator that adds retry logic to any
//!   [`Generate`] implementation
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::config::GeneratorConfig;
use crate::error::{PipelineError, Result};
use crate::utils::truncate_for_log;

/// Maximum retry attempts for one generation call.
const MAX_RETRIES: usize = 5;

/// Initial delay between retries.
#[cfg(not(test))]
const BASE_DELAY: StdDuration = StdDuration::from_secs(1);
#[cfg(test)]
const BASE_DELAY: StdDuration = StdDuration::from_millis(1);

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, Copy)]
pub struct SamplingOptions {
    /// Creativity; higher values diversify titles and bodies.
    pub temperature: f32,
    /// Upper bound on reply length.
    pub max_tokens: u32,
}

/// One prompt: a system persona plus the user instruction text.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Prompt {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Trait for async interaction with the generation service.
///
/// Implementors send one prompt and receive the raw reply text. The
/// abstraction allows decorators (like retry logic) and in-process fakes
/// for testing.
pub trait Generate {
    /// Send one prompt to the generation service and return the raw reply.
    async fn generate(&self, prompt: &Prompt, options: &SamplingOptions) -> Result<String>;
}

impl<T: Generate> Generate for &T {
    async fn generate(&self, prompt: &Prompt, options: &SamplingOptions) -> Result<String> {
        (**self).generate(prompt, options).await
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Generate`]
/// implementation.
///
/// Designed to be resilient against rate limiting, network issues, and
/// temporary server errors. The delay between retries follows:
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryGenerate<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryGenerate<T>
where
    T: Generate,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryGenerate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryGenerate")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Generate for RetryGenerate<T>
where
    T: Generate,
{
    #[instrument(level = "info", skip_all)]
    async fn generate(&self, prompt: &Prompt, options: &SamplingOptions) -> Result<String> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.generate(prompt, options).await {
                Ok(reply) => {
                    return Ok(reply);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "generate() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "generate() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Client for an OpenAI-compatible chat completions endpoint.
///
/// Holds the process-wide credentials; shared read-only across all calls
/// of one request.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    pub fn new(config: &GeneratorConfig, api_key: String) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends in '/'.
        let normalized = format!("{}/", config.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalized)
            .and_then(|base| base.join("chat/completions"))
            .map_err(|e| {
                PipelineError::Config(format!("invalid base URL {:?}: {e}", config.base_url))
            })?;

        Ok(ChatClient {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
            model: config.model.clone(),
        })
    }
}

impl Generate for ChatClient {
    #[instrument(level = "info", skip_all)]
    async fn generate(&self, prompt: &Prompt, options: &SamplingOptions) -> Result<String> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                %status,
                body = %truncate_for_log(&body, 300),
                "generation service returned an error status"
            );
            return Err(PipelineError::Generation(format!(
                "generation service returned {status}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Generation(format!("unreadable response body: {e}")))?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u128,
            bytes = reply.len(),
            "generation call completed"
        );
        Ok(reply)
    }
}

/// High-level entry point: one generation call with exponential backoff.
///
/// This is what the content expander uses for every call it issues.
#[instrument(level = "info", skip_all)]
pub async fn generate_with_backoff<G: Generate>(
    client: &G,
    prompt: &Prompt,
    options: &SamplingOptions,
) -> Result<String> {
    let t0 = Instant::now();
    let retrying = RetryGenerate::new(client, MAX_RETRIES, BASE_DELAY);
    let result = retrying.generate(prompt, options).await;
    let dt = t0.elapsed();

    match &result {
        Ok(_) => info!(
            elapsed_ms_total = dt.as_millis() as u128,
            "generate_with_backoff succeeded"
        ),
        Err(e) => {
            error!(elapsed_ms_total = dt.as_millis() as u128, error = %e, "generate_with_backoff failed")
        }
    }
    result
}
