//! Failover controller over the backend registry
//!
//! Exposes a single `invoke(prompt) -> text` operation that walks the ordered
//! registry until one backend answers. The failover cursor is a loop index
//! scoped to one logical call - every `invoke` re-resolves from the top of the
//! registry, so the best-ranked backend is always tried first and no mutable
//! cursor state is ever shared across concurrent queries.
//!
//! Every failure kind advances the cursor. Quota errors and other errors are
//! distinguished only for logging and metrics; a user-facing answer should
//! never stall on a backend that cannot currently serve it.

use crate::backend::{GenerationBackend, GenerationError};
use crate::config::BackendConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Terminal failure for one logical `invoke` call
#[derive(Debug, Error)]
pub enum FailoverError {
    /// Every backend in the registry failed
    ///
    /// Callers (tools, orchestrator) must convert this into an apologetic
    /// response; it must never cross the HTTP boundary as an exception.
    #[error("all {attempted} generation backends exhausted; last error: {last_error}")]
    Exhausted { attempted: usize, last_error: String },
}

/// Ordered multi-backend invoker
pub struct FailoverController {
    backends: Vec<Arc<dyn GenerationBackend>>,
    per_call_timeout: Duration,
}

impl FailoverController {
    /// Build a controller over an already-ordered registry
    ///
    /// Returns an error message suitable for configuration diagnostics when
    /// the registry is empty.
    pub fn new(
        backends: Vec<Arc<dyn GenerationBackend>>,
        per_call_timeout: Duration,
    ) -> crate::error::AppResult<Self> {
        if backends.is_empty() {
            return Err(crate::error::AppError::Config(
                "Failover controller requires a non-empty backend registry".to_string(),
            ));
        }
        Ok(Self {
            backends,
            per_call_timeout,
        })
    }

    /// Build a controller from registry configuration
    ///
    /// `registry` must already be in failover order (see `Config::registry`).
    pub fn from_registry(
        registry: Vec<BackendConfig>,
        timeout_seconds: u64,
    ) -> crate::error::AppResult<Self> {
        let per_call_timeout = Duration::from_secs(timeout_seconds);
        let backends: Vec<Arc<dyn GenerationBackend>> = registry
            .into_iter()
            .map(|config| {
                Arc::new(crate::backend::AgentBackend::new(config, timeout_seconds))
                    as Arc<dyn GenerationBackend>
            })
            .collect();
        Self::new(backends, per_call_timeout)
    }

    /// Number of backends in the registry
    pub fn registry_len(&self) -> usize {
        self.backends.len()
    }

    /// Worst-case wall-clock bound for one `invoke`
    ///
    /// There is no application-level timeout budget across the pipeline, so
    /// the pathological case is every backend timing out in sequence:
    /// `registry length x per-call timeout`.
    pub fn worst_case_invoke_timeout(&self) -> Duration {
        self.per_call_timeout * self.backends.len() as u32
    }

    /// Invoke the registry with deterministic failover
    ///
    /// Walks backends in priority order, short-circuiting on the first
    /// success. Both quota-class and other failures advance to the next
    /// backend. Exhausting the registry is terminal for this call.
    pub async fn invoke(&self, prompt: &str) -> Result<String, FailoverError> {
        let mut last_error: Option<GenerationError> = None;

        // cursor: usize is request-scoped by construction - it lives on this
        // call's stack and restarts at the top of the registry next call.
        for (cursor, backend) in self.backends.iter().enumerate() {
            tracing::debug!(
                backend = %backend.name(),
                cursor = cursor,
                registry_len = self.backends.len(),
                prompt_length = prompt.len(),
                "Attempting generation backend"
            );

            match backend.generate(prompt).await {
                Ok(text) => {
                    crate::metrics::record_backend_attempt(backend.name(), "success");
                    tracing::info!(
                        backend = %backend.name(),
                        cursor = cursor,
                        response_length = text.len(),
                        "Generation succeeded"
                    );
                    return Ok(text);
                }
                Err(e) => {
                    if e.is_quota() {
                        crate::metrics::record_backend_attempt(backend.name(), "quota");
                        tracing::warn!(
                            backend = %backend.name(),
                            cursor = cursor,
                            error = %e,
                            "Backend quota exhausted, advancing failover cursor"
                        );
                    } else {
                        crate::metrics::record_backend_attempt(backend.name(), "error");
                        tracing::warn!(
                            backend = %backend.name(),
                            cursor = cursor,
                            error = %e,
                            "Backend failed, advancing failover cursor"
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no backends attempted".to_string());

        tracing::error!(
            registry_len = self.backends.len(),
            last_error = %last_error,
            "Backend registry exhausted"
        );

        Err(FailoverError::Exhausted {
            attempted: self.backends.len(),
            last_error,
        })
    }
}
