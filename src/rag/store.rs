//! RagStore trait: abstract interface for the persisted vector store.
//!
//! The primary implementation is `SqliteRagStore` in the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A stored manual chunk with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// The text content of the chunk, header context included.
    pub content: String,
    /// Source identifier (manual path).
    pub source: String,
    /// Header mapping (JSON object).
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Similarity score (higher = better).
    pub score: f32,
}

/// Abstract trait for vector storage backends.
#[async_trait]
pub trait RagStore: Send + Sync {
    /// Insert multiple chunks with their embeddings in one transaction.
    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), ApiError>;

    /// Search for chunks similar to the query embedding, best first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    /// Get the total chunk count.
    async fn count(&self) -> Result<usize, ApiError>;

    /// Clear all chunks and record the embedding model of the next index.
    async fn reset_with_model(&self, embedding_model: &str) -> Result<(), ApiError>;

    /// Clear, record the model and insert `items` in one transaction.
    async fn replace_all(
        &self,
        embedding_model: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), ApiError>;

    /// Embedding model the stored vectors were computed with, if recorded.
    async fn embedding_model(&self) -> Result<Option<String>, ApiError>;
}
