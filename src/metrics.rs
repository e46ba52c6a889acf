//! Prometheus metrics
//!
//! Counters live in the default registry and are exposed as text on
//! `GET /metrics`. Label cardinality stays small: intent names, backend
//! names from config, and a fixed set of stage/outcome labels.

use prometheus::{IntCounterVec, TextEncoder, register_int_counter_vec};
use std::sync::LazyLock;

static QUERIES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "nutriroute_queries_total",
        "Queries processed, labeled by classified intent",
        &["intent"]
    )
    .expect("metric registration is infallible at startup")
});

static BACKEND_ATTEMPTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "nutriroute_backend_attempts_total",
        "Generation backend attempts, labeled by backend and outcome",
        &["backend", "outcome"]
    )
    .expect("metric registration is infallible at startup")
});

static SOFT_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "nutriroute_soft_failures_total",
        "Pipeline failures converted to apology responses, labeled by stage",
        &["stage"]
    )
    .expect("metric registration is infallible at startup")
});

/// Count one processed query by intent
pub fn record_query(intent: &str) {
    QUERIES_TOTAL.with_label_values(&[intent]).inc();
}

/// Count one backend attempt; outcome is "success", "quota", or "error"
pub fn record_backend_attempt(backend: &str, outcome: &str) {
    BACKEND_ATTEMPTS_TOTAL
        .with_label_values(&[backend, outcome])
        .inc();
}

/// Count one internal failure that degraded to a soft response
pub fn record_soft_failure(stage: &str) {
    SOFT_FAILURES_TOTAL.with_label_values(&[stage]).inc();
}

/// Render the default registry in Prometheus text exposition format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    encoder
        .encode_to_string(&prometheus::gather())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate_and_render() {
        record_query("general");
        record_backend_attempt("primary-flash", "success");
        record_soft_failure("backend_exhausted");

        let text = render();
        assert!(text.contains("nutriroute_queries_total"));
        assert!(text.contains("nutriroute_backend_attempts_total"));
        assert!(text.contains("nutriroute_soft_failures_total"));
    }
}
