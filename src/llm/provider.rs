use async_trait::async_trait;

use crate::core::errors::ApiError;
use super::types::{ChatRequest, EmbeddingTask, ProviderModel};

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "gemini", "lmstudio")
    fn name(&self) -> &str;

    /// model used for generation
    fn model(&self) -> &str;

    /// check if the provider is healthy/reachable
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// list available models from the provider
    async fn list_models(&self) -> Result<Vec<ProviderModel>, ApiError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    /// model used for embeddings; recorded alongside the stored vectors
    fn model(&self) -> &str;

    /// one vector per input, in input order
    async fn embed(&self, inputs: &[String], task: EmbeddingTask)
        -> Result<Vec<Vec<f32>>, ApiError>;
}
