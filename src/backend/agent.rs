//! Generation backend implementation over open-agent-sdk
//!
//! Wraps one configured endpoint as a [`GenerationBackend`]. Each call builds
//! `AgentOptions` from the endpoint configuration, streams the completion with
//! a timeout, and collects the text blocks into a single string.

use crate::backend::{GenerationBackend, GenerationError};
use crate::config::BackendConfig;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::time::{Duration, timeout};

/// Maximum size for a collected completion (bytes)
///
/// Answers are clamped to a handful of lines downstream; a response larger
/// than this indicates runaway generation and is rejected mid-stream instead
/// of accumulating unbounded memory.
const MAX_RESPONSE_BYTES: usize = 32 * 1024;

/// One registry entry backed by an OpenAI-compatible endpoint
pub struct AgentBackend {
    config: BackendConfig,
    timeout_seconds: u64,
}

impl AgentBackend {
    /// Create a backend from its registry configuration
    pub fn new(config: BackendConfig, timeout_seconds: u64) -> Self {
        Self {
            config,
            timeout_seconds,
        }
    }

    /// Per-call timeout enforced on the streaming query
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// Classify an SDK/transport error message as quota-class or other
    ///
    /// Quota detection is deliberately loose (substring probes for the usual
    /// markers); the failover controller treats both kinds as advanceable, so
    /// a misclassification only affects logging and metrics.
    fn classify_failure(&self, message: String) -> GenerationError {
        let lower = message.to_lowercase();
        let quota = lower.contains("429")
            || lower.contains("quota")
            || lower.contains("rate limit")
            || lower.contains("rate_limit")
            || lower.contains("resource exhausted")
            || lower.contains("too many requests");

        if quota {
            GenerationError::QuotaExceeded {
                backend: self.config.name().to_string(),
                message,
            }
        } else {
            GenerationError::Failed {
                backend: self.config.name().to_string(),
                message,
            }
        }
    }
}

#[async_trait]
impl GenerationBackend for AgentBackend {
    fn name(&self) -> &str {
        self.config.name()
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let options = open_agent::AgentOptions::builder()
            .model(self.config.name())
            .base_url(self.config.base_url())
            .max_tokens(self.config.max_tokens() as u32)
            .temperature(self.config.temperature() as f32)
            .build()
            .map_err(|e| GenerationError::Failed {
                backend: self.config.name().to_string(),
                message: format!("failed to build AgentOptions: {}", e),
            })?;

        let timeout_duration = Duration::from_secs(self.timeout_seconds);

        let mut stream = timeout(timeout_duration, open_agent::query(prompt, &options))
            .await
            .map_err(|_elapsed| {
                tracing::warn!(
                    backend = %self.config.name(),
                    base_url = %self.config.base_url(),
                    timeout_seconds = self.timeout_seconds,
                    "Generation query timed out"
                );
                GenerationError::Failed {
                    backend: self.config.name().to_string(),
                    message: format!("timed out after {}s", self.timeout_seconds),
                }
            })?
            .map_err(|e| self.classify_failure(format!("query failed: {}", e)))?;

        let mut response_text = String::new();
        while let Some(result) = stream.next().await {
            match result {
                Ok(block) => {
                    use open_agent::ContentBlock;
                    if let ContentBlock::Text(text_block) = block {
                        if response_text.len() + text_block.text.len() > MAX_RESPONSE_BYTES {
                            tracing::error!(
                                backend = %self.config.name(),
                                current_length = response_text.len(),
                                max_allowed = MAX_RESPONSE_BYTES,
                                "Generation response exceeded size limit"
                            );
                            return Err(GenerationError::Failed {
                                backend: self.config.name().to_string(),
                                message: format!(
                                    "response exceeded {} byte limit",
                                    MAX_RESPONSE_BYTES
                                ),
                            });
                        }
                        response_text.push_str(&text_block.text);
                    }
                }
                Err(e) => {
                    return Err(self.classify_failure(format!(
                        "stream error after {} bytes: {}",
                        response_text.len(),
                        e
                    )));
                }
            }
        }

        if response_text.trim().is_empty() {
            return Err(GenerationError::Failed {
                backend: self.config.name().to_string(),
                message: "backend returned an empty response".to_string(),
            });
        }

        Ok(response_text)
    }
}
