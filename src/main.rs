use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use code_rag::api::{self, AppState};
use code_rag::config::Config;
use code_rag::engine::Engine;
use code_rag::llm::http::HttpProvider;
use code_rag::llm::mock::MockProvider;
use code_rag::llm::ModelProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        "LLM provider: {} ({})",
        config.llm.provider,
        config.llm.base_url
    );

    let provider: Arc<dyn ModelProvider> = match config.llm.provider.as_str() {
        "mock" => Arc::new(MockProvider::new(config.llm.embedding_dim)),
        _ => Arc::new(HttpProvider::new(config.llm.clone())),
    };

    let state = AppState {
        engine: Arc::new(Engine::new(config.clone(), provider)),
    };

    let app = Router::new()
        .route("/api/repos", get(api::repos::list_repos))
        .route("/api/repos", post(api::repos::upload_repo))
        .route("/api/repos/{id}", delete(api::repos::delete_repo))
        .route("/api/repos/{id}/query", post(api::query::query_repo))
        .route("/api/repos/{id}/optimize", post(api::query::optimize_repo))
        .route("/api/repos/{id}/suggest", post(api::query::suggest_repo))
        .route("/api/repos/{id}/docs", get(api::repos::get_docs))
        .route("/api/repos/{id}/docs/report", get(api::repos::get_docs_report))
        // Raise axum's 2 MB default so full archives fit in one request
        .layer(axum::extract::DefaultBodyLimit::max(
            config.max_upload_bytes as usize,
        ))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
