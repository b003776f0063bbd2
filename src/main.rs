//! SYMP.T.O.M - symptom-orientation chat assistant
//!
//! Backend for the consultation front-end: routes each question to an
//! allow-listed medical reference, grounds the model's reply in that page and
//! tracks whether the assistant is waiting on a yes/no answer.

mod api;
mod assistant;
mod config;
mod conversation;
mod dialogue;
mod llm;
mod sources;
mod system_prompt;

use api::{create_router, AppState, SharedAssistant};
use assistant::Assistant;
use config::AssistantConfig;
use llm::LlmConfig;
use sources::{HttpFetcher, ReqwestFetcher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound between two idle-session sweeps
const SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "symptom=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AssistantConfig::load()?;
    let port: u16 = std::env::var("SYMPTOM_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let Some(completion) = LlmConfig::from_env().build_service(&config.model) else {
        tracing::error!("No completion provider configured. Set OPENAI_API_KEY or LLM_GATEWAY.");
        std::process::exit(1);
    };
    tracing::info!(
        model = %config.model,
        sources = config.catalog.len(),
        temperature = config.temperature,
        "Assistant configured"
    );

    let http: Arc<dyn HttpFetcher> = Arc::new(ReqwestFetcher::default());
    let assistant: SharedAssistant = Assistant::new(&config, completion, http);
    let state = AppState::new(assistant);
    let _sweeper = state.sessions.start_eviction(
        config.session_idle_timeout,
        config.session_idle_timeout.min(SWEEP_PERIOD),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("SYMP.T.O.M server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
