//! Typed view of the merged `config.yml` + `secrets.yaml` tree.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub ingest: IngestSettings,
    pub store: StoreSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash-lite".to_string(),
            base_url: None,
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: None,
            max_tokens: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "text-embedding-004".to_string(),
            base_url: None,
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            batch_size: 100,
            timeout_secs: 60,
        }
    }
}

/// Candidate overshoot and final context window of the hybrid retriever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub candidate_k: usize,
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            candidate_k: 10,
            top_k: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub manual_path: PathBuf,
    pub strip_headers: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            manual_path: PathBuf::from("data/manuals/orbit_5g_guide.md"),
            strip_headers: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("noc_oracle.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// Required in `x-api-key` on mutating routes when set.
    pub api_token: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
            api_token: None,
        }
    }
}

/// Explicit key first, then the named environment variable.
pub fn resolve_api_key(explicit: Option<&str>, env_name: &str) -> Option<String> {
    explicit
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .or_else(|| {
            std::env::var(env_name)
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_tree_fills_in_defaults() {
        let config: OracleConfig = serde_json::from_value(json!({
            "retrieval": { "top_k": 5 },
            "llm": { "provider": "lmstudio", "base_url": "http://localhost:1234" }
        }))
        .unwrap();

        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.candidate_k, 10);
        assert_eq!(config.llm.provider, "lmstudio");
        assert_eq!(config.llm.model, "gemini-2.0-flash-lite");
        assert_eq!(config.embedding.batch_size, 100);
        assert!(!config.ingest.strip_headers);
    }

    #[test]
    fn explicit_api_key_wins_over_environment() {
        let key = resolve_api_key(Some("  from-secrets "), "NOC_ORACLE_TEST_UNSET_KEY");
        assert_eq!(key.as_deref(), Some("from-secrets"));

        assert!(resolve_api_key(Some(""), "NOC_ORACLE_TEST_UNSET_KEY").is_none());
        assert!(resolve_api_key(None, "NOC_ORACLE_TEST_UNSET_KEY").is_none());
    }
}
