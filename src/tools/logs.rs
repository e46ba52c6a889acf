//! Structured-data tool
//!
//! Answers personal-log questions in four steps: generate one read-only SQL
//! statement via the failover controller, sanitize and validate it, execute
//! it against the read-only store, then summarize the rows with one further
//! generation call.
//!
//! The user-id filter is the load-bearing access control: the generated
//! statement itself must carry a literal `user_id = <caller>` equality for
//! any personal-log table, and validation rejects statements that do not.
//! There is no repair loop; a bad statement degrades to a typed error that
//! the orchestrator turns into a soft failure message.

use crate::backend::FailoverController;
use crate::store::{LogStore, StoreError};
use crate::tools::{ToolError, ToolOutcome, is_empty_result};
use chrono::NaiveDate;
use std::sync::Arc;

/// Schema description handed to the generator verbatim
///
/// The tool is given the schema, never allowed to infer it; only the tables
/// the product needs for log questions are listed.
const SCHEMA_DESCRIPTION: &str = "\
daily_logs (user_id BIGINT, food_id BIGINT, serving_amount DOUBLE PRECISION, \
meal_type TEXT, log_date DATE)
foods      (id BIGINT, name TEXT, calories DOUBLE PRECISION, protein DOUBLE PRECISION, \
carbohydrates DOUBLE PRECISION, fat DOUBLE PRECISION)
exercises  (id BIGINT, name TEXT, met_value DOUBLE PRECISION)";

/// Turns log questions into answers backed by the user's own rows
pub struct LogQueryTool {
    failover: Arc<FailoverController>,
    store: Arc<dyn LogStore>,
}

impl LogQueryTool {
    pub fn new(failover: Arc<FailoverController>, store: Arc<dyn LogStore>) -> Self {
        Self { failover, store }
    }

    /// Answer a personal-log question for one user
    pub async fn answer_from_logs(
        &self,
        question: &str,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<ToolOutcome, ToolError> {
        let prompt = build_generation_prompt(question, user_id, today);

        let raw = self.failover.invoke(&prompt).await?;
        let statement = sanitize_statement(&raw);
        validate_statement(&statement, user_id)?;

        tracing::debug!(user_id, statement = %statement, "Executing generated statement");

        let rows = match self.store.select_rows(&statement).await {
            Ok(rows) => rows,
            Err(StoreError::Execution(message)) => {
                return Err(ToolError::StatementExecution(message));
            }
        };

        if is_empty_result(&rows) {
            return Ok(ToolOutcome::NoRows);
        }

        let summary_prompt = build_summary_prompt(question, &rows);
        let summary = self.failover.invoke(&summary_prompt).await?;

        Ok(ToolOutcome::Answer(summary.trim().to_string()))
    }
}

/// Build the statement-generation prompt
///
/// Carries the caller's id as a literal, the current date for resolving
/// relative ranges, the fixed schema, and the hard constraints.
fn build_generation_prompt(question: &str, user_id: i64, today: NaiveDate) -> String {
    format!(
        "You write a single PostgreSQL SELECT statement to answer a nutrition \
question about one user's logged data.\n\
\n\
Schema:\n{schema}\n\
\n\
Rules:\n\
- Output exactly one SELECT statement and nothing else. No explanation, no \
markdown.\n\
- Every reference to daily_logs must include the filter user_id = {user_id}.\n\
- Never write data. SELECT only.\n\
- Match text case-insensitively with ILIKE.\n\
- Today's date is {today}. Resolve relative dates (today, yesterday, last N \
days) to absolute date predicates on log_date.\n\
- meal_type values are uppercase: BREAKFAST, LUNCH, DINNER, SNACK.\n\
- Nutrition columns in foods are per 100 g; scale user-facing quantities by \
(serving_amount / 100.0).\n\
\n\
Question: {question}",
        schema = SCHEMA_DESCRIPTION,
        user_id = user_id,
        today = today,
        question = question,
    )
}

/// Build the row-summarization prompt
fn build_summary_prompt(question: &str, rows: &serde_json::Value) -> String {
    format!(
        "Answer the user's question in 2 to 4 natural sentences using only \
the data below. Do not invent values that are not present.\n\
\n\
Question: {question}\n\
Data (JSON rows): {rows}",
        question = question,
        rows = rows,
    )
}

/// Strip code-fence markup and the trailing statement terminator
pub fn sanitize_statement(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(stripped) = text.strip_prefix("```sql") {
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }

    text.trim().trim_end_matches(';').trim().to_string()
}

/// Reject anything that is not a single read-only statement with the caller's
/// user-id filter
pub fn validate_statement(statement: &str, user_id: i64) -> Result<(), ToolError> {
    let lower = statement.to_lowercase();

    let first_word = lower.split_whitespace().next().unwrap_or("");
    if first_word != "select" {
        return Err(ToolError::StatementGeneration(format!(
            "statement does not begin with SELECT: '{}'",
            truncate_for_log(statement)
        )));
    }

    if statement.contains(';') {
        return Err(ToolError::StatementGeneration(
            "statement contains an embedded terminator".to_string(),
        ));
    }

    if lower.contains("--") || lower.contains("/*") {
        return Err(ToolError::StatementGeneration(
            "statement contains SQL comments".to_string(),
        ));
    }

    if lower.contains("daily_logs") && !contains_user_filter(&lower, user_id) {
        return Err(ToolError::StatementGeneration(format!(
            "statement touches daily_logs without a user_id = {} filter",
            user_id
        )));
    }

    Ok(())
}

/// True when the statement carries a literal `user_id = <id>` equality
///
/// Whitespace-insensitive, and the id must match exactly (a filter for user
/// 70 does not satisfy user 7).
fn contains_user_filter(lower: &str, user_id: i64) -> bool {
    let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();
    let needle = "user_id=";

    let mut search_from = 0;
    while let Some(position) = compact[search_from..].find(needle) {
        let digits_start = search_from + position + needle.len();
        let digits: String = compact[digits_start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if digits.parse::<i64>() == Ok(user_id) {
            return true;
        }
        search_from = digits_start;
    }
    false
}

fn truncate_for_log(statement: &str) -> String {
    const MAX: usize = 120;
    if statement.len() <= MAX {
        statement.to_string()
    } else {
        let cut = statement
            .char_indices()
            .take_while(|(i, _)| *i < MAX)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &statement[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_sql_fences() {
        let raw = "```sql\nSELECT f.name FROM foods f\n```";
        assert_eq!(sanitize_statement(raw), "SELECT f.name FROM foods f");
    }

    #[test]
    fn test_sanitize_strips_bare_fences_and_terminator() {
        let raw = "```\nSELECT 1;\n```";
        assert_eq!(sanitize_statement(raw), "SELECT 1");
    }

    #[test]
    fn test_sanitize_plain_statement_unchanged() {
        assert_eq!(sanitize_statement("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_validate_accepts_filtered_select() {
        let statement = "SELECT f.name FROM daily_logs d \
JOIN foods f ON f.id = d.food_id WHERE d.user_id = 7";
        assert!(validate_statement(statement, 7).is_ok());
    }

    #[test]
    fn test_validate_rejects_write_statements() {
        let err = validate_statement("DELETE FROM daily_logs WHERE user_id = 7", 7);
        assert!(matches!(err, Err(ToolError::StatementGeneration(_))));

        let err = validate_statement("UPDATE foods SET calories = 0", 7);
        assert!(matches!(err, Err(ToolError::StatementGeneration(_))));
    }

    #[test]
    fn test_validate_rejects_missing_user_filter() {
        let err = validate_statement("SELECT count(*) FROM daily_logs", 7);
        assert!(matches!(err, Err(ToolError::StatementGeneration(_))));
    }

    #[test]
    fn test_validate_rejects_wrong_user_filter() {
        let err = validate_statement("SELECT count(*) FROM daily_logs WHERE user_id = 70", 7);
        assert!(matches!(err, Err(ToolError::StatementGeneration(_))));
    }

    #[test]
    fn test_validate_accepts_compact_filter_spelling() {
        assert!(validate_statement("SELECT 1 FROM daily_logs WHERE user_id=7", 7).is_ok());
        assert!(validate_statement("SELECT 1 FROM daily_logs WHERE d.user_id  =  7", 7).is_ok());
    }

    #[test]
    fn test_validate_rejects_embedded_terminator_and_comments() {
        let err = validate_statement("SELECT 1; DROP TABLE foods", 7);
        assert!(matches!(err, Err(ToolError::StatementGeneration(_))));

        let err = validate_statement("SELECT 1 -- sneaky", 7);
        assert!(matches!(err, Err(ToolError::StatementGeneration(_))));
    }

    #[test]
    fn test_generation_prompt_carries_id_date_and_schema() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        let prompt = build_generation_prompt("what did I eat today", 7, today);
        assert!(prompt.contains("user_id = 7"));
        assert!(prompt.contains("2026-08-24"));
        assert!(prompt.contains("daily_logs"));
        assert!(prompt.contains("serving_amount / 100.0"));
        assert!(prompt.contains("BREAKFAST"));
    }
}
