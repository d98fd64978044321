use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let chunks = state.index.count().await?;
    let indexed_model = state.rag_store.embedding_model().await.unwrap_or(None);
    let retrieval = state.oracle.retrieval();
    let llm_healthy = state.llm.health_check().await.unwrap_or(false);

    Ok(Json(json!({
        "chunks": chunks,
        "llm": {
            "provider": state.llm.name(),
            "model": state.llm.model(),
            "healthy": llm_healthy
        },
        "embedding": {
            "provider": state.embedder.name(),
            "model": state.embedder.model(),
            "indexed_model": indexed_model
        },
        "retrieval": {
            "candidate_k": retrieval.candidate_k,
            "top_k": retrieval.top_k
        },
        "manual_path": state.manual_path()
    })))
}
