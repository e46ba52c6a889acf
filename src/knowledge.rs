//! Document collection client for knowledge retrieval
//!
//! Talks to a Chroma-style vector store over HTTP: the service owns embedding,
//! so retrieval is a single `query` call with the raw question text. The
//! collection is seeded offline; this client only reads.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One retrieved passage
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
}

/// Errors from the retrieval service
///
/// All variants are recoverable: the knowledge tool falls back to context-free
/// generation when retrieval is unreachable.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("retrieval request failed: {0}")]
    Request(String),

    #[error("retrieval service returned status {0}")]
    Status(u16),

    #[error("retrieval response malformed: {0}")]
    Malformed(String),
}

/// k-nearest-neighbor lookup over the curated document collection
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Return up to `k` passages most similar to `question`
    async fn similarity_search(
        &self,
        question: &str,
        k: usize,
    ) -> Result<Vec<Document>, RetrievalError>;
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query_texts: [&'a str; 1],
    n_results: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
    /// One inner list per query text; we always send exactly one
    documents: Vec<Vec<String>>,
}

/// HTTP client for a Chroma-compatible collection endpoint
pub struct ChromaIndex {
    client: reqwest::Client,
    query_url: String,
}

impl ChromaIndex {
    /// Build a client for one named collection
    pub fn new(base_url: &str, collection: &str, timeout_seconds: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .unwrap_or_default();
        let query_url = format!(
            "{}/api/v1/collections/{}/query",
            base_url.trim_end_matches('/'),
            collection
        );
        Self { client, query_url }
    }
}

#[async_trait]
impl DocumentIndex for ChromaIndex {
    async fn similarity_search(
        &self,
        question: &str,
        k: usize,
    ) -> Result<Vec<Document>, RetrievalError> {
        let request = QueryRequest {
            query_texts: [question],
            n_results: k,
        };

        let response = self
            .client
            .post(&self.query_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RetrievalError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status(status.as_u16()));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Malformed(e.to_string()))?;

        let passages = body
            .documents
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Malformed("missing documents list".to_string()))?;

        Ok(passages
            .into_iter()
            .filter(|text| !text.trim().is_empty())
            .map(|text| Document { text })
            .collect())
    }
}
