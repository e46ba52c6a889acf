//! Knowledge-retrieval tool
//!
//! Answers app-usage and policy questions from the curated document
//! collection. Retrieval failures never fail the turn: when the collection is
//! unreachable the tool answers context-free instead, which costs grounding
//! but keeps the assistant responsive.

use crate::backend::FailoverController;
use crate::knowledge::DocumentIndex;
use crate::tools::{ToolError, ToolOutcome};
use std::sync::Arc;

/// Answers questions from the knowledge collection
pub struct DocSearchTool {
    failover: Arc<FailoverController>,
    index: Arc<dyn DocumentIndex>,
    top_k: usize,
}

impl DocSearchTool {
    pub fn new(failover: Arc<FailoverController>, index: Arc<dyn DocumentIndex>, top_k: usize) -> Self {
        Self {
            failover,
            index,
            top_k,
        }
    }

    /// Answer an app-usage or policy question
    pub async fn answer_from_docs(&self, question: &str) -> Result<ToolOutcome, ToolError> {
        let prompt = match self.index.similarity_search(question, self.top_k).await {
            Ok(documents) if !documents.is_empty() => {
                tracing::debug!(
                    retrieved = documents.len(),
                    "Grounding answer in retrieved passages"
                );
                build_grounded_prompt(question, &documents)
            }
            Ok(_) => {
                tracing::debug!("No passages retrieved, answering context-free");
                build_context_free_prompt(question)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Retrieval unavailable, answering context-free");
                build_context_free_prompt(question)
            }
        };

        let answer = self.failover.invoke(&prompt).await?;
        Ok(ToolOutcome::Answer(answer.trim().to_string()))
    }
}

fn build_grounded_prompt(question: &str, documents: &[crate::knowledge::Document]) -> String {
    let context = documents
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join("\n---\n");

    format!(
        "Answer the user's question about the nutrition-tracking app in 2 to \
4 sentences, using only the context below. If the context does not cover the \
question, say you don't have that information.\n\
\n\
Context:\n{context}\n\
\n\
Question: {question}",
        context = context,
        question = question,
    )
}

fn build_context_free_prompt(question: &str) -> String {
    format!(
        "Answer the user's question about using a nutrition-tracking app in \
2 to 4 sentences. Be direct and practical.\n\
\n\
Question: {question}",
        question = question,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Document;

    #[test]
    fn test_grounded_prompt_includes_all_passages() {
        let documents = vec![
            Document {
                text: "Go to Settings then Account to change your password.".to_string(),
            },
            Document {
                text: "Password resets are emailed within five minutes.".to_string(),
            },
        ];
        let prompt = build_grounded_prompt("how do I change my password", &documents);
        assert!(prompt.contains("Settings then Account"));
        assert!(prompt.contains("emailed within five minutes"));
        assert!(prompt.contains("how do I change my password"));
    }

    #[test]
    fn test_context_free_prompt_carries_the_question() {
        let prompt = build_context_free_prompt("where are notification settings");
        assert!(prompt.contains("where are notification settings"));
        assert!(!prompt.contains("Context:"));
    }
}
