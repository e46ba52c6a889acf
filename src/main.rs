//! Nutriroute server entry point

use clap::Parser;
use nutriroute::backend::FailoverController;
use nutriroute::cli::{Cli, Commands};
use nutriroute::config::Config;
use nutriroute::handlers::{self, AppState};
use nutriroute::history::InMemoryHistory;
use nutriroute::knowledge::ChromaIndex;
use nutriroute::orchestrator::Orchestrator;
use nutriroute::store::PgLogStore;
use nutriroute::tools::{DocSearchTool, LogQueryTool};
use std::sync::Arc;

#[tokio::main]
async fn main() -> nutriroute::AppResult<()> {
    let cli = Cli::parse();

    if let Some(Commands::Config { output }) = &cli.command {
        return nutriroute::cli::write_config_template(output.as_ref());
    }

    let config = Config::from_file(&cli.config)?;
    nutriroute::telemetry::init(&config.observability.log_level);

    let registry = config.registry();
    tracing::info!(
        backends = registry.len(),
        order = ?registry.iter().map(|b| b.name()).collect::<Vec<_>>(),
        "Backend registry resolved"
    );

    let failover = Arc::new(FailoverController::from_registry(
        registry,
        config.server.request_timeout_seconds,
    )?);
    tracing::info!(
        worst_case_seconds = failover.worst_case_invoke_timeout().as_secs(),
        "Failover controller ready"
    );

    let store = Arc::new(PgLogStore::connect(
        &config.database.url,
        config.database.max_connections,
    )?);
    let index = Arc::new(ChromaIndex::new(
        &config.knowledge.base_url,
        &config.knowledge.collection,
        config.server.request_timeout_seconds,
    ));
    let history = Arc::new(InMemoryHistory::new(config.history.capacity));

    let orchestrator = Arc::new(Orchestrator::new(
        failover.clone(),
        LogQueryTool::new(failover.clone(), store),
        DocSearchTool::new(failover, index, config.knowledge.top_k),
        history.clone(),
        config.assistant.max_answer_lines,
    ));

    let state = AppState {
        orchestrator,
        history,
    };
    let app = handlers::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| nutriroute::AppError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(address = %addr, "Nutriroute listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| nutriroute::AppError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
