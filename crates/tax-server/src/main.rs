//! tax-server
//!
//! Axum server exposing the tax advisor graph over REST.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::LlmProvider;
use agent_runtime::GroqProvider;
use tax_advisor::{AdvisorConfig, TaxAdvisor};

use crate::handlers::{health_check, invoke_handler, list_agents};
use crate::state::AppState;

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/agents", get(list_agents))
        .route("/api/invoke", post(invoke_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let provider: Arc<dyn LlmProvider> = Arc::new(GroqProvider::from_env()?);
    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to {}", provider.name()),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ {} not reachable - runs will answer \"I don't know\"", provider.name());
            tracing::warn!("  Check GROQ_API_KEY and GROQ_BASE_URL in .env");
        }
    }

    let config = AdvisorConfig::from_env()?;
    let advisor = TaxAdvisor::new(provider.clone(), config)?;
    tracing::info!(
        model = %advisor.config().model,
        max_steps = advisor.config().max_steps,
        "Agents: {}",
        advisor.agent_names().join(", ")
    );

    let state = AppState::new(provider, advisor);
    let app = app(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("tax-server running on http://{}", addr);
    tracing::info!("  GET  /health      - Health check");
    tracing::info!("  GET  /api/agents  - Coordinator and workers");
    tracing::info!("  POST /api/invoke  - Calculate next month's tax");

    axum::serve(listener, app).await?;

    Ok(())
}
