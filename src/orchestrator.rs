//! Query orchestrator
//!
//! Composes the classifier, the two tools, and direct generation into one
//! `process_query` entry point. This is the single backstop for the whole
//! pipeline: every lower layer may return an error, and all of them are
//! mapped here to fixed user-readable strings with `success = false`. The
//! HTTP layer above never sees a server error caused by this subsystem.
//!
//! Both the user turn and the assistant turn are written to the bounded
//! history store; history failures are logged and swallowed, never allowed
//! to fail an otherwise-good answer.

use crate::backend::FailoverController;
use crate::classifier::{Intent, classify};
use crate::history::{HistoryEntry, HistoryStore, Sender, room_for_user};
use crate::tools::{DocSearchTool, LogQueryTool, ToolError, ToolOutcome};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Fixed responses for degraded paths
pub const NO_DATA_RESPONSE: &str = "You haven't logged any data for this.";
pub const LOOKUP_FAILED_RESPONSE: &str = "I couldn't find that information.";
pub const BACKENDS_DOWN_RESPONSE: &str =
    "I'm having trouble connecting to my systems right now. Please try again in a moment.";

/// One inbound question
#[derive(Debug, Clone)]
pub struct Query {
    pub text: String,
    pub user_id: i64,
    pub received_at: DateTime<Utc>,
}

impl Query {
    pub fn new(text: String, user_id: i64) -> Self {
        Self {
            text,
            user_id,
            received_at: Utc::now(),
        }
    }
}

/// The assistant's reply for one turn
///
/// `success` is false on any degraded path, including the empty sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub success: bool,
}

/// Classifier-driven dispatch over the tools and direct generation
pub struct Orchestrator {
    failover: Arc<FailoverController>,
    log_tool: LogQueryTool,
    doc_tool: DocSearchTool,
    history: Arc<dyn HistoryStore>,
    max_answer_lines: usize,
}

impl Orchestrator {
    pub fn new(
        failover: Arc<FailoverController>,
        log_tool: LogQueryTool,
        doc_tool: DocSearchTool,
        history: Arc<dyn HistoryStore>,
        max_answer_lines: usize,
    ) -> Self {
        Self {
            failover,
            log_tool,
            doc_tool,
            history,
            max_answer_lines,
        }
    }

    /// Process one query end to end
    pub async fn process_query(&self, query: Query) -> Reply {
        let intent = classify(&query.text);
        crate::metrics::record_query(intent.as_str());
        tracing::info!(
            user_id = query.user_id,
            intent = %intent,
            query_length = query.text.len(),
            "Processing query"
        );

        self.record_turn(&query, Sender::User, &query.text).await;

        let reply = match intent {
            Intent::StructuredLookup => self.run_log_lookup(&query).await,
            Intent::KnowledgeLookup => self.run_doc_lookup(&query).await,
            Intent::General => self.run_general(&query).await,
        };

        self.record_turn(&query, Sender::Assistant, &reply.text)
            .await;

        reply
    }

    async fn run_log_lookup(&self, query: &Query) -> Reply {
        let today = query.received_at.date_naive();
        match self
            .log_tool
            .answer_from_logs(&query.text, query.user_id, today)
            .await
        {
            Ok(ToolOutcome::Answer(text)) => self.answer(text),
            Ok(ToolOutcome::NoRows) => {
                // The sentinel terminates the turn; the tool is invoked at
                // most once and never retried against another statement.
                crate::metrics::record_soft_failure("no_rows");
                Reply {
                    text: NO_DATA_RESPONSE.to_string(),
                    success: false,
                }
            }
            Err(e) => self.degrade(query, "structured_lookup", e),
        }
    }

    async fn run_doc_lookup(&self, query: &Query) -> Reply {
        match self.doc_tool.answer_from_docs(&query.text).await {
            Ok(ToolOutcome::Answer(text)) => self.answer(text),
            Ok(ToolOutcome::NoRows) => Reply {
                text: LOOKUP_FAILED_RESPONSE.to_string(),
                success: false,
            },
            Err(e) => self.degrade(query, "knowledge_lookup", e),
        }
    }

    async fn run_general(&self, query: &Query) -> Reply {
        let prompt = build_general_prompt(&query.text);
        match self.failover.invoke(&prompt).await {
            Ok(text) => self.answer(text.trim().to_string()),
            Err(e) => self.degrade(query, "general", ToolError::Backends(e)),
        }
    }

    fn answer(&self, text: String) -> Reply {
        Reply {
            text: clamp_lines(&text, self.max_answer_lines),
            success: true,
        }
    }

    /// Map a tool error to its fixed user-facing string
    fn degrade(&self, query: &Query, stage: &str, error: ToolError) -> Reply {
        tracing::warn!(
            user_id = query.user_id,
            stage = stage,
            error = %error,
            "Pipeline failure degraded to soft response"
        );

        let text = match &error {
            ToolError::StatementGeneration(_) | ToolError::StatementExecution(_) => {
                crate::metrics::record_soft_failure("statement");
                LOOKUP_FAILED_RESPONSE
            }
            ToolError::Backends(_) => {
                crate::metrics::record_soft_failure("backend_exhausted");
                BACKENDS_DOWN_RESPONSE
            }
        };

        Reply {
            text: text.to_string(),
            success: false,
        }
    }

    async fn record_turn(&self, query: &Query, sender: Sender, message: &str) {
        let entry = HistoryEntry {
            room_id: room_for_user(query.user_id),
            timestamp: Utc::now(),
            sender_id: query.user_id,
            sender,
            message: message.to_string(),
        };
        if let Err(e) = self.history.append(entry).await {
            tracing::warn!(user_id = query.user_id, error = %e, "History write failed");
        }
    }
}

/// Prompt for direct generation with the scope boundary
///
/// Health, nutrition, and app questions are answered; unrelated general
/// knowledge is politely declined.
fn build_general_prompt(question: &str) -> String {
    format!(
        "You are the assistant inside a nutrition-tracking app. Answer \
questions about health, nutrition, fitness, or using the app in 2 to 4 \
sentences. If the question is unrelated to those topics, politely say it is \
outside what you can help with and suggest asking about nutrition or the \
app instead.\n\
\n\
Question: {question}",
        question = question,
    )
}

/// Clamp an answer to at most `max_lines` non-empty lines
pub fn clamp_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.len() <= max_lines {
        text.trim().to_string()
    } else {
        lines[..max_lines].join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_keeps_short_answers_intact() {
        let text = "Line one.\nLine two.";
        assert_eq!(clamp_lines(text, 10), text);
    }

    #[test]
    fn test_clamp_truncates_long_answers() {
        let text = (1..=15)
            .map(|i| format!("Line {}.", i))
            .collect::<Vec<_>>()
            .join("\n");
        let clamped = clamp_lines(&text, 10);
        assert_eq!(clamped.lines().count(), 10);
        assert!(clamped.ends_with("Line 10."));
    }

    #[test]
    fn test_clamp_ignores_blank_lines_when_counting() {
        let text = "One.\n\nTwo.\n\nThree.";
        assert_eq!(clamp_lines(text, 3), text);
    }

    #[test]
    fn test_general_prompt_carries_scope_boundary() {
        let prompt = build_general_prompt("what is a good protein source");
        assert!(prompt.contains("what is a good protein source"));
        assert!(prompt.contains("politely"));
    }

    #[test]
    fn test_degradation_strings_are_user_readable() {
        for text in [
            NO_DATA_RESPONSE,
            LOOKUP_FAILED_RESPONSE,
            BACKENDS_DOWN_RESPONSE,
        ] {
            assert!(!text.is_empty());
            assert!(!text.to_lowercase().contains("error"));
            assert!(!text.to_lowercase().contains("exception"));
        }
    }
}
