//! Generation backend abstraction
//!
//! A backend is an external text-generation service capable of
//! `generate(prompt) -> text`. The trait seam allows the failover controller,
//! tools, and orchestrator to be tested against in-process fakes without any
//! network traffic.
//!
//! Errors are split into two kinds because the failover decision depends on
//! the distinction: quota/rate-limit failures and everything else. Both kinds
//! advance the failover cursor (a failing backend should never stall a
//! user-facing answer), but they are logged and counted separately.

pub mod agent;
pub mod failover;

pub use agent::AgentBackend;
pub use failover::{FailoverController, FailoverError};

use async_trait::async_trait;
use thiserror::Error;

/// Errors a single generation backend can produce
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Quota or rate limit exhausted on this backend
    ///
    /// Recoverable by advancing to the next backend in the registry.
    #[error("quota or rate limit exhausted on backend '{backend}': {message}")]
    QuotaExceeded { backend: String, message: String },

    /// Any other backend failure (timeout, connection refused, bad response)
    ///
    /// Also advances the cursor - the registry ordering already encodes a
    /// best-effort-first policy, so there is no reason to stall on a broken
    /// backend.
    #[error("backend '{backend}' failed: {message}")]
    Failed { backend: String, message: String },
}

impl GenerationError {
    /// True when the failure is quota/rate-limit class
    pub fn is_quota(&self) -> bool {
        matches!(self, GenerationError::QuotaExceeded { .. })
    }

    /// Name of the backend that produced this error
    pub fn backend(&self) -> &str {
        match self {
            GenerationError::QuotaExceeded { backend, .. }
            | GenerationError::Failed { backend, .. } => backend,
        }
    }
}

/// A text-generation backend
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend identifier for logging and failover diagnostics
    fn name(&self) -> &str;

    /// Generate a completion for the given prompt
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
