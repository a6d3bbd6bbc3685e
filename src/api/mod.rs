//! HTTP surface. Handlers validate transport concerns (body shape, zip
//! structure) and delegate everything else to the engine.

pub mod query;
pub mod repos;

use std::sync::Arc;

use axum::http::StatusCode;

use crate::engine::Engine;
use crate::error::EngineError;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// Map an engine error to a status code and client-safe message.
pub fn error_response(err: EngineError) -> (StatusCode, String) {
    let status = match &err {
        EngineError::UnknownRepository(_) => StatusCode::NOT_FOUND,
        EngineError::EmptyArchive
        | EngineError::EmptyQuery
        | EngineError::SizeLimitExceeded { .. } => StatusCode::BAD_REQUEST,
        EngineError::DimensionMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::Provider(p) if p.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Provider(_) => StatusCode::BAD_GATEWAY,
    };
    (status, err.to_string())
}
