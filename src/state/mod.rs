use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService, OracleConfig};
use crate::ingest::ManualIngestor;
use crate::llm::{
    build_chat_provider, build_embedding_provider, EmbeddingProvider, GenerationSettings,
    LlmProvider,
};
use crate::manual::ManualGenerator;
use crate::oracle::NocOracle;
use crate::rag::chunker::{ChunkerConfig, HeaderChunker};
use crate::rag::{EmbeddingIndex, RagStore, SqliteRagStore, VectorIndex};
use crate::server::security::ApiToken;

pub mod error;

use error::InitializationError;

/// Application state shared by the CLI commands and the HTTP routes.
///
/// Every handle is built once here and passed down explicitly:
/// - configuration and resolved paths
/// - the chat and embedding providers
/// - the persisted RAG store and the index over it
/// - the query oracle and the manual ingestor
/// - the token guarding mutating routes
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<OracleConfig>,
    pub llm: Arc<dyn LlmProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub rag_store: Arc<dyn RagStore>,
    pub index: Arc<dyn VectorIndex>,
    pub oracle: NocOracle,
    pub ingestor: Arc<ManualIngestor>,
    pub api_token: ApiToken,
}

impl AppState {
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        Self::initialize_with_paths(Arc::new(AppPaths::new())).await
    }

    /// Loads config, builds providers and opens the store.
    pub async fn initialize_with_paths(
        paths: Arc<AppPaths>,
    ) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let llm = build_chat_provider(&settings.llm).map_err(|e| InitializationError::Llm(e.into()))?;
        let embedder = build_embedding_provider(&settings.embedding)
            .map_err(|e| InitializationError::Embedding(e.into()))?;

        Self::from_parts(paths, config, settings, llm, embedder).await
    }

    /// Wires the state around already-built providers.
    pub async fn from_parts(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: OracleConfig,
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Arc<Self>, InitializationError> {
        let store_path = store_path(&paths, &settings);
        let rag_store: Arc<dyn RagStore> = Arc::new(
            SqliteRagStore::with_path(store_path.clone())
                .await
                .map_err(|e| InitializationError::Store(e.into()))?,
        );
        tracing::debug!("RAG store at {}", store_path.display());

        match rag_store.embedding_model().await {
            Ok(Some(indexed)) if indexed != embedder.model() => {
                tracing::warn!(
                    indexed = %indexed,
                    configured = embedder.model(),
                    "Index was built with a different embedding model; re-run ingestion"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to read index metadata: {}", e),
        }

        let index: Arc<dyn VectorIndex> =
            Arc::new(EmbeddingIndex::new(embedder.clone(), rag_store.clone()));

        let oracle = NocOracle::new(
            index.clone(),
            llm.clone(),
            settings.retrieval,
            GenerationSettings::from(&settings.llm),
        );

        let chunker = HeaderChunker::new(ChunkerConfig {
            strip_headers: settings.ingest.strip_headers,
            ..ChunkerConfig::default()
        });
        let ingestor = Arc::new(ManualIngestor::new(index.clone(), chunker));

        let api_token = ApiToken::from_settings(&settings.server);
        if !api_token.is_enabled() {
            tracing::debug!("No server.api_token configured; mutating routes rely on CORS preflight");
        }

        Ok(Arc::new(AppState {
            paths,
            config,
            settings: Arc::new(settings),
            llm,
            embedder,
            rag_store,
            index,
            oracle,
            ingestor,
            api_token,
        }))
    }

    /// Configured manual location, resolved against the data dir and project root.
    pub fn manual_path(&self) -> PathBuf {
        self.paths.resolve(&self.settings.ingest.manual_path)
    }

    pub fn manual_generator(&self) -> ManualGenerator {
        ManualGenerator::new(self.llm.clone(), GenerationSettings::from(&self.settings.llm))
    }
}

fn store_path(paths: &AppPaths, settings: &OracleConfig) -> PathBuf {
    let raw = &settings.store.path;
    if raw.is_absolute() {
        raw.clone()
    } else {
        paths.user_data_dir.join(raw)
    }
}
