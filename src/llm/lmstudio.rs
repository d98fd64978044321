use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use super::provider::{EmbeddingProvider, LlmProvider};
use super::types::{ChatRequest, EmbeddingTask, ProviderModel};

pub const DEFAULT_BASE_URL: &str = "http://localhost:1234";

/// OpenAI-compatible local server (LM Studio and friends), for offline runs.
#[derive(Clone)]
pub struct LmStudioProvider {
    base_url: String,
    model: String,
    client: Client,
}

impl LmStudioProvider {
    pub fn new(
        base_url: Option<&str>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.into(),
            client,
        })
    }
}

#[derive(Deserialize)]
struct OpenAiModelsResponse {
    data: Vec<OpenAiModelInfo>,
}

#[derive(Deserialize)]
struct OpenAiModelInfo {
    id: String,
}

fn build_chat_body(model: &str, request: &ChatRequest) -> Value {
    let mut body = json!({
        "model": model,
        "messages": request.messages,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
        if let Some(t) = request.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
    }

    body
}

fn parse_chat_response(payload: &Value) -> Result<String, ApiError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ApiError::Upstream("LM Studio response has no message content".to_string()))
}

fn parse_embeddings(payload: &Value) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::new();
    if let Some(data) = payload["data"].as_array() {
        for item in data {
            if let Some(vals) = item["embedding"].as_array() {
                let vec: Vec<f32> = vals.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect();
                embeddings.push(vec);
            }
        }
    }
    embeddings
}

#[async_trait]
impl LlmProvider for LmStudioProvider {
    fn name(&self) -> &str {
        "lmstudio"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/v1/models", self.base_url);
        let res = self.client.get(&url).send().await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, ApiError> {
        let url = format!("{}/v1/models", self.base_url);
        let res = self.client.get(&url).send().await.map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            return Err(ApiError::Upstream(format!("Failed to list models: {}", res.status())));
        }

        let response: OpenAiModelsResponse = res.json().await.map_err(ApiError::upstream)?;

        Ok(response
            .data
            .into_iter()
            .map(|m| ProviderModel {
                id: m.id.clone(),
                name: m.id,
            })
            .collect())
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = build_chat_body(&self.model, &request);

        let res = self.client.post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("LM Studio chat error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        parse_chat_response(&payload)
    }
}

#[async_trait]
impl EmbeddingProvider for LmStudioProvider {
    fn name(&self) -> &str {
        "lmstudio"
    }

    fn model(&self) -> &str {
        &self.model
    }

    // OpenAI-compatible servers have no task type; both sides embed alike.
    async fn embed(
        &self,
        inputs: &[String],
        _task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let res = self.client.post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("LM Studio embed error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        Ok(parse_embeddings(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;

    #[test]
    fn chat_body_includes_optional_sampling_params() {
        let request = ChatRequest {
            messages: vec![ChatMessage::user("E-101?")],
            temperature: Some(0.0),
            max_tokens: None,
        };
        let body = build_chat_body("local-model", &request);

        assert_eq!(body["model"], "local-model");
        assert_eq!(body["messages"][0]["content"], "E-101?");
        assert_eq!(body["temperature"], 0.0);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn parses_chat_and_embedding_payloads() {
        let chat = json!({ "choices": [{ "message": { "content": "Replace the PSU." } }] });
        assert_eq!(parse_chat_response(&chat).unwrap(), "Replace the PSU.");
        assert!(parse_chat_response(&json!({ "choices": [] })).is_err());

        let embeddings = json!({ "data": [{ "embedding": [1.0, 0.0] }, { "embedding": [0.0, 1.0] }] });
        assert_eq!(parse_embeddings(&embeddings), vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_lmstudio_connection() {
        let provider = LmStudioProvider::new(None, "local-model", Duration::from_secs(30)).unwrap();

        let models = provider.list_models().await;
        match models {
            Ok(models) => {
                println!("LM Studio Models found: {}", models.len());
                for m in &models {
                    println!(" - {}", m.id);
                }
            }
            Err(e) => panic!("Failed to connect to LM Studio: {}", e),
        }
    }
}
