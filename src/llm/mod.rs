pub mod gemini;
pub mod lmstudio;
pub mod provider;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use crate::core::config::settings::resolve_api_key;
use crate::core::config::{EmbeddingSettings, LlmSettings};
use crate::core::errors::ApiError;

pub use gemini::GeminiProvider;
pub use lmstudio::LmStudioProvider;
pub use provider::{EmbeddingProvider, LlmProvider};
pub use types::{ChatMessage, ChatRequest, EmbeddingTask, GenerationSettings};

pub fn build_chat_provider(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, ApiError> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    match settings.provider.trim().to_lowercase().as_str() {
        "gemini" => {
            let api_key = require_api_key(settings.api_key.as_deref(), &settings.api_key_env)?;
            let provider = GeminiProvider::new(
                api_key,
                settings.model.clone(),
                settings.base_url.as_deref(),
                timeout,
            )?;
            Ok(Arc::new(provider))
        }
        "lmstudio" => Ok(Arc::new(LmStudioProvider::new(
            settings.base_url.as_deref(),
            settings.model.clone(),
            timeout,
        )?)),
        other => Err(ApiError::Config(format!("Unsupported LLM provider '{}'", other))),
    }
}

pub fn build_embedding_provider(
    settings: &EmbeddingSettings,
) -> Result<Arc<dyn EmbeddingProvider>, ApiError> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    match settings.provider.trim().to_lowercase().as_str() {
        "gemini" => {
            let api_key = require_api_key(settings.api_key.as_deref(), &settings.api_key_env)?;
            let provider = GeminiProvider::new(
                api_key,
                settings.model.clone(),
                settings.base_url.as_deref(),
                timeout,
            )?
            .with_batch_size(settings.batch_size);
            Ok(Arc::new(provider))
        }
        "lmstudio" => Ok(Arc::new(LmStudioProvider::new(
            settings.base_url.as_deref(),
            settings.model.clone(),
            timeout,
        )?)),
        other => Err(ApiError::Config(format!(
            "Unsupported embedding provider '{}'",
            other
        ))),
    }
}

fn require_api_key(explicit: Option<&str>, env_name: &str) -> Result<String, ApiError> {
    resolve_api_key(explicit, env_name)
        .ok_or_else(|| ApiError::Config(format!("{} not found.", env_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_gemini_key_is_reported_by_env_name() {
        let settings = LlmSettings {
            api_key_env: "NOC_ORACLE_TEST_MISSING_KEY".to_string(),
            ..LlmSettings::default()
        };
        match build_chat_provider(&settings) {
            Err(ApiError::Config(msg)) => assert_eq!(msg, "NOC_ORACLE_TEST_MISSING_KEY not found."),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("provider should not build without a key"),
        }
    }

    #[test]
    fn builds_configured_providers() {
        let llm = LlmSettings {
            api_key: Some("key".to_string()),
            ..LlmSettings::default()
        };
        assert_eq!(build_chat_provider(&llm).unwrap().name(), "gemini");

        let local = EmbeddingSettings {
            provider: "LMStudio".to_string(),
            model: "nomic-embed".to_string(),
            ..EmbeddingSettings::default()
        };
        let embedder = build_embedding_provider(&local).unwrap();
        assert_eq!(embedder.name(), "lmstudio");
        assert_eq!(embedder.model(), "nomic-embed");

        let unknown = LlmSettings {
            provider: "openai".to_string(),
            ..LlmSettings::default()
        };
        assert!(matches!(build_chat_provider(&unknown), Err(ApiError::Config(_))));
    }
}
