//! Generation-service configuration.
//!
//! Process-wide, read at startup, never mutated afterwards. Values come
//! from an optional YAML file with the API key overridable from the
//! environment (`OPENAI_API_KEY`) or the command line.

use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// Configuration for the external generation service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Model name sent with every generation call.
    pub model: String,
    /// API key; usually left unset here and supplied via the environment.
    pub api_key: Option<String>,
    /// Worker-pool width for per-item generation calls.
    pub concurrency: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            concurrency: 4,
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from a YAML file, or fall back to defaults when
    /// no path is given.
    pub async fn load(path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(GeneratorConfig::default());
        };
        let raw = tokio::fs::read_to_string(path).await?;
        serde_yaml::from_str(&raw)
            .map_err(|e| PipelineError::Config(format!("could not parse {path}: {e}")))
    }

    /// Resolve the API key, preferring an explicitly supplied one over the
    /// config file's.
    pub fn resolve_api_key(&self, override_key: Option<String>) -> Result<String> {
        override_key
            .or_else(|| self.api_key.clone())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::Config(
                    "missing API key; set OPENAI_API_KEY or api_key in the config file".into(),
                )
            })
    }
}
