//! Vector index over manual chunks.
//!
//! `EmbeddingIndex` embeds chunk text with the configured provider and keeps
//! the vectors in a `RagStore`; callers only ever see `DocumentChunk`s.

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::document::{DocumentChunk, HeaderMap};
use super::store::{RagStore, StoredChunk};
use crate::core::errors::ApiError;
use crate::llm::{EmbeddingProvider, EmbeddingTask};

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embeds and stores `chunks`; returns how many were added.
    async fn add(&self, chunks: &[DocumentChunk], source: &str) -> Result<usize, ApiError>;

    /// Up to `k` chunks, most similar first.
    async fn similarity_search(&self, query: &str, k: usize)
        -> Result<Vec<DocumentChunk>, ApiError>;

    /// Drops every indexed chunk.
    async fn reset(&self) -> Result<(), ApiError>;

    /// Swaps the whole index for `chunks`.
    async fn replace(&self, chunks: &[DocumentChunk], source: &str) -> Result<usize, ApiError> {
        self.reset().await?;
        self.add(chunks, source).await
    }

    async fn count(&self) -> Result<usize, ApiError>;
}

pub struct EmbeddingIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn RagStore>,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn RagStore>) -> Self {
        Self { embedder, store }
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model()
    }

    async fn embed_chunks(
        &self,
        chunks: &[DocumentChunk],
        source: &str,
    ) -> Result<Vec<(StoredChunk, Vec<f32>)>, ApiError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts, EmbeddingTask::Document).await?;
        if embeddings.len() != chunks.len() {
            return Err(ApiError::Upstream(format!(
                "Embedding count mismatch: expected {}, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut items = Vec::with_capacity(chunks.len());
        for (position, (chunk, embedding)) in chunks.iter().zip(embeddings).enumerate() {
            items.push((to_stored(chunk, source, position)?, embedding));
        }
        Ok(items)
    }
}

/// Deterministic id: the same manual ingested twice yields the same ids.
pub fn chunk_id(source: &str, position: usize, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(position.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

fn to_stored(chunk: &DocumentChunk, source: &str, position: usize) -> Result<StoredChunk, ApiError> {
    let metadata = serde_json::to_value(&chunk.metadata).map_err(ApiError::internal)?;
    Ok(StoredChunk {
        chunk_id: chunk_id(source, position, &chunk.content),
        content: chunk.content.clone(),
        source: source.to_string(),
        metadata: Some(metadata),
    })
}

fn from_stored(stored: StoredChunk) -> DocumentChunk {
    let metadata = stored
        .metadata
        .and_then(|value| serde_json::from_value::<HeaderMap>(value).ok())
        .unwrap_or_default();
    DocumentChunk::new(stored.content, metadata)
}

#[async_trait]
impl VectorIndex for EmbeddingIndex {
    async fn add(&self, chunks: &[DocumentChunk], source: &str) -> Result<usize, ApiError> {
        let items = self.embed_chunks(chunks, source).await?;
        let added = items.len();
        self.store.insert_batch(items).await?;
        Ok(added)
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<DocumentChunk>, ApiError> {
        let embeddings = self
            .embedder
            .embed(&[query.to_string()], EmbeddingTask::Query)
            .await?;
        let query_embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Upstream("Embedding provider returned no vector".to_string()))?;

        let results = self.store.search(&query_embedding, k).await?;
        Ok(results.into_iter().map(|r| from_stored(r.chunk)).collect())
    }

    async fn reset(&self) -> Result<(), ApiError> {
        self.store.reset_with_model(self.embedder.model()).await
    }

    /// Embeds before touching the store, so a failed embedding call
    /// leaves the previous index in place.
    async fn replace(&self, chunks: &[DocumentChunk], source: &str) -> Result<usize, ApiError> {
        let items = self.embed_chunks(chunks, source).await?;
        let added = items.len();
        self.store.replace_all(self.embedder.model(), items).await?;
        Ok(added)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        self.store.count().await
    }
}
