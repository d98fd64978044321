//! Ingestion pipeline: manual file → header chunks → injected context → index.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::core::errors::ApiError;
use crate::rag::chunker::HeaderChunker;
use crate::rag::index::VectorIndex;

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub chunks: usize,
    /// Start of the first enriched chunk, to eyeball the injected context.
    pub preview: Option<String>,
}

pub struct ManualIngestor {
    index: Arc<dyn VectorIndex>,
    chunker: HeaderChunker,
}

impl ManualIngestor {
    pub fn new(index: Arc<dyn VectorIndex>, chunker: HeaderChunker) -> Self {
        Self { index, chunker }
    }

    /// Replaces the index contents with the chunks of `path`.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport, ApiError> {
        if !path.is_file() {
            return Err(ApiError::NotFound(format!(
                "Manual file not found at {}",
                path.display()
            )));
        }

        tracing::info!("Loading manual from {}", path.display());
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(ApiError::internal)?;

        self.ingest_text(&text, &path.display().to_string()).await
    }

    pub async fn ingest_text(&self, text: &str, source: &str) -> Result<IngestReport, ApiError> {
        let chunks = self.chunker.chunk(text);
        tracing::info!("Split manual into {} chunks", chunks.len());

        // replace, not add: old vectors would otherwise linger next to the new ones
        let added = self.index.replace(&chunks, source).await?;
        tracing::info!(source, chunks = added, "Ingestion complete");

        let preview = chunks
            .first()
            .map(|chunk| chunk.content.chars().take(PREVIEW_CHARS).collect());

        Ok(IngestReport {
            source: source.to_string(),
            chunks: added,
            preview,
        })
    }
}
