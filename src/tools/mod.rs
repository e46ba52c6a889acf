//! Query tools dispatched by the orchestrator
//!
//! A tool is a bounded operation that answers one question: `logs` reads the
//! user's structured nutrition rows, `docs` retrieves from the curated
//! knowledge collection. Tools own their failure handling up to the point of
//! a typed error; the orchestrator maps those errors to user-facing strings.

pub mod docs;
pub mod logs;

pub use docs::DocSearchTool;
pub use logs::LogQueryTool;

use crate::backend::FailoverError;
use thiserror::Error;

/// Result of one tool invocation
///
/// `NoRows` is the empty sentinel: no matching data exists for this user and
/// question. It is distinct from a legitimately zero-valued answer ("0
/// calories logged today" is an `Answer`). The orchestrator terminates the
/// turn on the sentinel without re-invoking the tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Answer(String),
    NoRows,
}

/// Errors a tool can surface to the orchestrator
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model did not produce a usable read-only statement
    #[error("statement generation failed: {0}")]
    StatementGeneration(String),

    /// The statement executed but the store rejected it
    #[error("statement execution failed: {0}")]
    StatementExecution(String),

    /// Every generation backend failed
    #[error(transparent)]
    Backends(#[from] FailoverError),
}

/// True when a JSON rowset carries no real data
///
/// Empty means an empty array or a rowset whose every value is NULL, which is
/// what an aggregate over zero rows produces. A numeric zero is real data.
pub fn is_empty_result(rows: &serde_json::Value) -> bool {
    match rows {
        serde_json::Value::Array(items) => {
            items.is_empty()
                || items.iter().all(|item| match item {
                    serde_json::Value::Object(fields) => {
                        fields.values().all(serde_json::Value::is_null)
                    }
                    serde_json::Value::Null => true,
                    _ => false,
                })
        }
        serde_json::Value::Null => true,
        _ => false,
    }
}
