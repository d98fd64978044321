//! Google Gemini API provider.
//!
//! Generation goes through `models/{model}:generateContent`, embeddings through
//! `models/{model}:batchEmbedContents`. Differences from OpenAI-compatible APIs:
//! - Auth via the `x-goog-api-key` header
//! - System instruction is a top-level `system_instruction` field
//! - Roles are `"user"` / `"model"`
//! - Embedding requests carry a task type (document vs query)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::core::errors::ApiError;
use super::provider::{EmbeddingProvider, LlmProvider};
use super::types::{ChatMessage, ChatRequest, EmbeddingTask, ProviderModel};

/// The default Google Gemini API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    batch_size: usize,
}

impl GeminiProvider {
    pub fn new(
        api_key: String,
        model: impl Into<String>,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: normalize_model_name(&model.into()),
            batch_size: 100,
        })
    }

    /// Caps the number of texts per `batchEmbedContents` call.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn endpoint_url(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }

    async fn post_json(&self, method: &str, body: &Value) -> Result<Value, ApiError> {
        let url = self.endpoint_url(method);
        debug!(model = self.model.as_str(), method, "Sending Gemini request");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                ApiError::Upstream(format!("Request to Gemini API failed: {}", e.without_url()))
            })?;

        let status = response.status();
        let body_text = response.text().await.map_err(|e| {
            ApiError::Upstream(format!("Failed to read Gemini response: {}", e.without_url()))
        })?;

        if !status.is_success() {
            return Err(ApiError::Upstream(format!(
                "HTTP {} from Gemini API: {}",
                status, body_text
            )));
        }

        serde_json::from_str(&body_text)
            .map_err(|e| ApiError::Upstream(format!("Invalid JSON in Gemini response: {}", e)))
    }
}

/// Accepts both `text-embedding-004` and `models/text-embedding-004`.
fn normalize_model_name(model: &str) -> String {
    model.trim().trim_start_matches("models/").to_string()
}

fn build_generate_body(request: &ChatRequest) -> Value {
    let system_text = request
        .messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let contents: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != "system")
        .map(message_to_gemini_json)
        .collect();

    let mut body = json!({ "contents": contents });

    if !system_text.is_empty() {
        body["system_instruction"] = json!({ "parts": [{ "text": system_text }] });
    }

    let mut generation_config = serde_json::Map::new();
    if let Some(t) = request.temperature {
        generation_config.insert("temperature".to_string(), json!(t));
    }
    if let Some(t) = request.max_tokens {
        generation_config.insert("maxOutputTokens".to_string(), json!(t));
    }
    if !generation_config.is_empty() {
        body["generationConfig"] = Value::Object(generation_config);
    }

    body
}

fn message_to_gemini_json(message: &ChatMessage) -> Value {
    let role = if message.role == "assistant" { "model" } else { "user" };
    json!({
        "role": role,
        "parts": [{ "text": message.content }]
    })
}

/// Joins the text parts of the first candidate.
fn parse_generate_response(body: &Value) -> Result<String, ApiError> {
    let candidates = body["candidates"]
        .as_array()
        .ok_or_else(|| ApiError::Upstream("Missing 'candidates' array in response".to_string()))?;

    let candidate = candidates
        .first()
        .ok_or_else(|| ApiError::Upstream("Empty 'candidates' array in response".to_string()))?;

    let parts = candidate["content"]["parts"].as_array().ok_or_else(|| {
        let reason = candidate["finishReason"].as_str().unwrap_or("unknown");
        ApiError::Upstream(format!(
            "Candidate has no content parts (finish reason: {})",
            reason
        ))
    })?;

    Ok(parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(""))
}

fn task_type(task: EmbeddingTask) -> &'static str {
    match task {
        EmbeddingTask::Document => "RETRIEVAL_DOCUMENT",
        EmbeddingTask::Query => "RETRIEVAL_QUERY",
    }
}

fn build_embed_body(model: &str, inputs: &[String], task: EmbeddingTask) -> Value {
    let requests: Vec<Value> = inputs
        .iter()
        .map(|text| {
            json!({
                "model": format!("models/{}", model),
                "content": { "parts": [{ "text": text }] },
                "taskType": task_type(task),
            })
        })
        .collect();
    json!({ "requests": requests })
}

fn parse_embed_response(body: &Value, expected: usize) -> Result<Vec<Vec<f32>>, ApiError> {
    let embeddings = body["embeddings"]
        .as_array()
        .ok_or_else(|| ApiError::Upstream("Missing 'embeddings' array in response".to_string()))?;

    if embeddings.len() != expected {
        return Err(ApiError::Upstream(format!(
            "Gemini returned {} embeddings for {} inputs",
            embeddings.len(),
            expected
        )));
    }

    embeddings
        .iter()
        .map(|item| {
            item["values"]
                .as_array()
                .map(|vals| {
                    vals.iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect::<Vec<f32>>()
                })
                .ok_or_else(|| ApiError::Upstream("Embedding entry without 'values'".to_string()))
        })
        .collect()
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(self.list_models().await.is_ok())
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, ApiError> {
        let url = format!("{}/models", self.base_url);
        let res = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ApiError::upstream(e.without_url()))?;

        if !res.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "Failed to list models: {}",
                res.status()
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| ApiError::upstream(e.without_url()))?;
        let models = payload["models"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|m| m["name"].as_str())
                    .map(|name| ProviderModel {
                        id: normalize_model_name(name),
                        name: name.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let body = build_generate_body(&request);
        let response = self.post_json("generateContent", &body).await?;
        parse_generate_response(&response)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(
        &self,
        inputs: &[String],
        task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, ApiError> {
        let mut vectors = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(self.batch_size) {
            let body = build_embed_body(&self.model, batch, task);
            let response = self.post_json("batchEmbedContents", &body).await?;
            vectors.extend(parse_embed_response(&response, batch.len())?);
        }
        Ok(vectors)
    }
}
