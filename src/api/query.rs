//! Query and repository-wide analysis endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::{error_response, AppState};
use crate::models::{AnswerResult, QueryRequest};

/// POST /api/repos/{id}/query - Ask a question about one repository.
pub async fn query_repo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<AnswerResult>, (StatusCode, String)> {
    let result = state
        .engine
        .query(id, &req.question)
        .await
        .map_err(error_response)?;
    Ok(Json(result))
}

/// POST /api/repos/{id}/optimize - Repository-wide optimization review.
pub async fn optimize_repo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnswerResult>, (StatusCode, String)> {
    let result = state.engine.optimize(id).await.map_err(error_response)?;
    Ok(Json(result))
}

/// POST /api/repos/{id}/suggest - Repository-wide improvement suggestions.
pub async fn suggest_repo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnswerResult>, (StatusCode, String)> {
    let result = state.engine.suggest(id).await.map_err(error_response)?;
    Ok(Json(result))
}
