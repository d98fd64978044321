use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::OracleConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 10] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "access_key",
    "access_token",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 4] = ["max_tokens", "api_key_env", "tokens", "token_count"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("NOC_ORACLE_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Public config with secrets merged over it, untyped.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        Ok(deep_merge(&public_config, &secrets_config))
    }

    /// Validated, typed configuration.
    pub fn load_settings(&self) -> Result<OracleConfig, ApiError> {
        let merged = self.load_config()?;
        validate_config(&merged)?;
        serde_json::from_value(merged)
            .map_err(|err| ApiError::Config(format!("Failed to parse config: {}", err)))
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ApiError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|err| {
        ApiError::Config(format!("Failed to read {}: {}", path.display(), err))
    })?;
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let value = serde_yaml::from_str::<Value>(&contents).map_err(|err| {
        ApiError::Config(format!("Failed to parse {}: {}", path.display(), err))
    })?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ApiError::Config(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_in(dir: &Path) -> ConfigService {
        ConfigService::new(Arc::new(AppPaths::with_dirs(
            dir.to_path_buf(),
            dir.to_path_buf(),
        )))
    }

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "llm": { "model": "gemini-2.0-flash-lite", "timeout_secs": 30 },
            "origins": ["a", "b"]
        });
        let override_value = json!({
            "llm": { "api_key": "k" },
            "origins": ["c"]
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "llm": { "model": "gemini-2.0-flash-lite", "timeout_secs": 30, "api_key": "k" },
                "origins": ["c"]
            })
        );
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": {
                "api_key": "secret",
                "api_key_env": "GEMINI_API_KEY",
                "max_tokens": 512
            },
            "items": [{ "password": "pw" }]
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": {
                    "api_key": "****",
                    "api_key_env": "GEMINI_API_KEY",
                    "max_tokens": 512
                },
                "items": [{ "password": "****" }]
            })
        );
    }

    #[test]
    fn load_settings_merges_secrets_over_public_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yml"),
            "retrieval:\n  candidate_k: 12\n  top_k: 4\nllm:\n  model: gemini-1.5-flash\n",
        )
        .unwrap();
        fs::write(dir.path().join("secrets.yaml"), "llm:\n  api_key: abc\n").unwrap();

        let settings = service_in(dir.path()).load_settings().unwrap();

        assert_eq!(settings.retrieval.candidate_k, 12);
        assert_eq!(settings.retrieval.top_k, 4);
        assert_eq!(settings.llm.model, "gemini-1.5-flash");
        assert_eq!(settings.llm.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn missing_files_yield_defaults_and_invalid_yaml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        let settings = service.load_settings().unwrap();
        assert_eq!(settings.retrieval.candidate_k, 10);
        assert_eq!(settings.retrieval.top_k, 3);

        fs::write(dir.path().join("config.yml"), "- just\n- a list\n").unwrap();
        assert!(matches!(service.load_settings(), Err(ApiError::Config(_))));
    }
}
