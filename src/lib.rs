//! Nutriroute - hybrid query router for a nutrition-tracking assistant
//!
//! Routes free-text user questions to one of three strategies: a structured
//! lookup against the user's own nutrition logs, a retrieval-grounded answer
//! from the app knowledge base, or direct generation. Generation runs behind
//! an ordered multi-backend failover controller so a quota-limited or
//! unreachable backend degrades latency, not availability.

pub mod backend;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod history;
pub mod knowledge;
pub mod metrics;
pub mod middleware;
pub mod orchestrator;
pub mod store;
pub mod telemetry;
pub mod tools;

pub use config::Config;
pub use error::{AppError, AppResult};
