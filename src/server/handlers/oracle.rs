use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::rag::DocumentChunk;
use crate::server::security::require_api_key;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SolutionRequest {
    pub query: String,
    /// Also ask the model without context, to show what it would guess.
    #[serde(default)]
    pub compare: bool,
}

#[derive(Debug, Deserialize)]
pub struct BaselineRequest {
    pub query: String,
}

/// Body of `POST /api/ingest`. Always `{}` today; a JSON body keeps the
/// route out of the CORS simple-request class.
#[derive(Debug, Default, Deserialize)]
pub struct IngestRequest {}

#[derive(Debug, Serialize)]
pub struct SolutionResponse {
    pub answer: String,
    pub sources: Vec<DocumentChunk>,
    pub grounded_fallback: bool,
    pub baseline: Option<String>,
}

/// Rejects blank queries; the query itself is passed on untouched.
fn require_query(query: &str) -> Result<(), ApiError> {
    if query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    Ok(())
}

pub async fn solution(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SolutionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_query(&payload.query)?;
    let comparison = state.oracle.compare(&payload.query, payload.compare).await;
    let grounded_fallback = comparison.grounded.is_grounded_fallback();

    Ok(Json(SolutionResponse {
        answer: comparison.grounded.answer,
        sources: comparison.grounded.sources,
        grounded_fallback,
        baseline: comparison.baseline,
    }))
}

pub async fn baseline(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BaselineRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_query(&payload.query)?;
    let answer = state.oracle.get_baseline_response(&payload.query).await;
    Ok(Json(json!({ "answer": answer })))
}

/// Re-ingests the configured manual, replacing the current index.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(_payload): Json<IngestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.api_token)?;
    let report = state.ingestor.ingest_file(&state.manual_path()).await?;
    Ok(Json(report))
}
