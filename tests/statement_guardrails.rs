//! Guardrails on generated statements
//!
//! The user-id filter inside the generated statement is the access control
//! for personal logs, so these tests exercise it directly: the generation
//! prompt always carries the caller's id as a literal, and validation
//! rejects any statement that touches the log table without that filter
//! before it can reach the store.

use async_trait::async_trait;
use chrono::NaiveDate;
use nutriroute::backend::{FailoverController, GenerationBackend, GenerationError};
use nutriroute::store::{LogStore, StoreError};
use nutriroute::tools::{LogQueryTool, ToolError, ToolOutcome};
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Backend that records every prompt and replays scripted responses in order
struct ScriptedBackend {
    prompts: Mutex<Vec<String>>,
    responses: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
        })
    }

    fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(GenerationError::Failed {
                backend: "scripted".to_string(),
                message: "script exhausted".to_string(),
            });
        }
        Ok(responses.remove(0))
    }
}

/// Store that counts executions and replays one rowset
struct CountingStore {
    calls: AtomicUsize,
    rows: serde_json::Value,
}

impl CountingStore {
    fn new(rows: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            rows,
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogStore for CountingStore {
    async fn select_rows(&self, _statement: &str) -> Result<serde_json::Value, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.clone())
    }
}

fn tool_with(
    backend: Arc<ScriptedBackend>,
    store: Arc<CountingStore>,
) -> LogQueryTool {
    let failover = Arc::new(
        FailoverController::new(vec![backend], Duration::from_secs(30))
            .expect("non-empty registry"),
    );
    LogQueryTool::new(failover, store)
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 24).unwrap()
}

#[tokio::test]
async fn unfiltered_statement_is_rejected_before_the_store() {
    let backend = ScriptedBackend::new(vec!["SELECT count(*) FROM daily_logs"]);
    let store = CountingStore::new(serde_json::json!([{"count": 4}]));
    let tool = tool_with(backend.clone(), store.clone());

    let result = tool.answer_from_logs("how many meals did I log", 7, today()).await;

    assert!(matches!(result, Err(ToolError::StatementGeneration(_))));
    assert_eq!(store.call_count(), 0, "store must never see the statement");
}

#[tokio::test]
async fn wrong_user_filter_is_rejected() {
    let backend =
        ScriptedBackend::new(vec!["SELECT count(*) FROM daily_logs WHERE user_id = 70"]);
    let store = CountingStore::new(serde_json::json!([{"count": 4}]));
    let tool = tool_with(backend, store.clone());

    let result = tool.answer_from_logs("how many meals did I log", 7, today()).await;

    assert!(matches!(result, Err(ToolError::StatementGeneration(_))));
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn write_statements_never_execute() {
    for statement in [
        "DELETE FROM daily_logs WHERE user_id = 7",
        "UPDATE daily_logs SET serving_amount = 0 WHERE user_id = 7",
        "INSERT INTO daily_logs VALUES (7, 1, 100, 'LUNCH', '2026-08-24')",
        "SELECT 1; DROP TABLE foods",
    ] {
        let backend = ScriptedBackend::new(vec![statement]);
        let store = CountingStore::new(serde_json::json!([]));
        let tool = tool_with(backend, store.clone());

        let result = tool.answer_from_logs("what did I eat", 7, today()).await;

        assert!(
            matches!(result, Err(ToolError::StatementGeneration(_))),
            "accepted: {statement:?}"
        );
        assert_eq!(store.call_count(), 0);
    }
}

#[tokio::test]
async fn fenced_statement_is_sanitized_and_executed() {
    let backend = ScriptedBackend::new(vec![
        "```sql\nSELECT count(*) AS meals FROM daily_logs WHERE user_id = 7;\n```",
        "You logged 4 meals.",
    ]);
    let store = CountingStore::new(serde_json::json!([{"meals": 4}]));
    let tool = tool_with(backend, store.clone());

    let result = tool
        .answer_from_logs("how many meals did I log", 7, today())
        .await
        .expect("should answer");

    assert_eq!(result, ToolOutcome::Answer("You logged 4 meals.".to_string()));
    assert_eq!(store.call_count(), 1);
}

#[test]
fn prompt_always_carries_the_literal_user_id() {
    // Twenty synthetic questions; the generation prompt must contain the
    // caller's id as a literal for every one of them.
    let questions: Vec<String> = (0..20)
        .map(|i| match i % 4 {
            0 => format!("what did I eat on day {}", i),
            1 => format!("total protein over the last {} days", i + 1),
            2 => format!("how many calories at dinner number {}", i),
            _ => format!("did I log workout {}", i),
        })
        .collect();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    for (i, question) in questions.iter().enumerate() {
        let user_id = 100 + i as i64;
        let statement = format!("SELECT count(*) FROM daily_logs WHERE user_id = {}", user_id);
        let backend = ScriptedBackend::new(vec![statement.as_str(), "Summary."]);
        let store = CountingStore::new(serde_json::json!([{"count": 1}]));
        let tool = tool_with(backend.clone(), store);

        runtime
            .block_on(tool.answer_from_logs(question, user_id, today()))
            .expect("should answer");

        let prompts = backend.recorded_prompts();
        assert!(
            prompts[0].contains(&format!("user_id = {}", user_id)),
            "prompt for {question:?} lacks the literal filter"
        );
    }
}

proptest! {
    /// For any user id, a statement filtered for a different id is rejected.
    #[test]
    fn prop_foreign_user_filter_rejected(user_id in 1i64..100_000, other in 1i64..100_000) {
        prop_assume!(user_id != other);
        let statement = format!("SELECT count(*) FROM daily_logs WHERE user_id = {}", other);
        let result = nutriroute::tools::logs::validate_statement(&statement, user_id);
        prop_assert!(result.is_err());
    }

    /// A correctly filtered SELECT always validates, with any spacing.
    #[test]
    fn prop_own_user_filter_accepted(user_id in 1i64..100_000, spaces in 0usize..4) {
        let pad = " ".repeat(spaces);
        let statement = format!(
            "SELECT count(*) FROM daily_logs WHERE user_id{pad}={pad}{user_id}"
        );
        prop_assert!(nutriroute::tools::logs::validate_statement(&statement, user_id).is_ok());
    }
}
