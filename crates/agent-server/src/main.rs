//! Trip planner HTTP Server
//!
//! Axum server exposing the orchestration loop with the travel-planner
//! tools.
//!
//! ```text
//! POST /query   {"question": "..."}  ->  {"answer": "..."}
//! GET  /health
//! ```

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::{routing::{get, post}, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::AgentBuilder;
use agent_runtime::{build_adapter, BackendSettings};
use travel_planner::PlannerConfig;

use crate::config::ServerConfig;
use crate::handlers::{health_check, query_handler};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment first so RUST_LOG from .env applies
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Model backend
    let backend = BackendSettings::from_env().context("invalid backend configuration")?;
    let adapter = build_adapter(&backend).context("failed to configure the model backend")?;
    let info = adapter.backend();
    tracing::info!("✓ Backend: {} ({}) via {:?} protocol", info.name, info.model, adapter.protocol());

    // Tools
    let tools = travel_planner::build_registry(&PlannerConfig::from_env())
        .context("failed to build the tool registry")?;

    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    let agent = AgentBuilder::new()
        .adapter(adapter)
        .tools(tools)
        .composer(travel_planner::composer())
        .max_turns(config.max_turns)
        .tool_timeout(config.tool_timeout)
        .parallel_tools(config.parallel_tools)
        .build()?;

    let state = AppState {
        agent: Arc::new(agent),
        backend_kind: backend.kind.to_string(),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 trip planner running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health  - Health check");
    tracing::info!("  POST /query   - Ask a travel question");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the application router
pub(crate) fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/query", post(query_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutting down");
}
