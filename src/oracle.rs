//! Query pipeline: hybrid retrieval, grounded generation, and the
//! ungrounded baseline used for comparison.
//!
//! The public operations never fail. Any error on the inner path becomes the
//! answer text, and the sources are left empty.

use std::sync::Arc;

use serde::Serialize;

use crate::core::config::RetrievalSettings;
use crate::core::errors::ApiError;
use crate::llm::{ChatRequest, GenerationSettings, LlmProvider};
use crate::rag::document::{DocumentChunk, CATEGORY, ERROR_CODE};
use crate::rag::index::VectorIndex;
use crate::rag::{keyword, prompt};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub answer: String,
    pub sources: Vec<DocumentChunk>,
}

impl Solution {
    fn error(err: &ApiError) -> Self {
        Self {
            answer: format!("Error processing request: {}", err),
            sources: Vec::new(),
        }
    }

    /// The model found the context but no procedure in it.
    pub fn is_grounded_fallback(&self) -> bool {
        prompt::is_fallback(&self.answer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub grounded: Solution,
    pub baseline: Option<String>,
}

#[derive(Clone)]
pub struct NocOracle {
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmProvider>,
    retrieval: RetrievalSettings,
    generation: GenerationSettings,
}

impl NocOracle {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmProvider>,
        retrieval: RetrievalSettings,
        generation: GenerationSettings,
    ) -> Self {
        Self {
            index,
            llm,
            retrieval,
            generation,
        }
    }

    pub fn retrieval(&self) -> RetrievalSettings {
        self.retrieval
    }

    /// Grounded answer plus the chunks it was built from.
    pub async fn get_solution(&self, query: &str) -> Solution {
        match self.try_solution(query).await {
            Ok(solution) => solution,
            Err(err) => {
                tracing::warn!("Grounded query failed: {}", err);
                Solution::error(&err)
            }
        }
    }

    pub async fn try_solution(&self, query: &str) -> Result<Solution, ApiError> {
        let sources = self.retrieve(query).await?;
        if sources.is_empty() {
            return Ok(Solution {
                answer: prompt::NO_RESULTS_ANSWER.to_string(),
                sources,
            });
        }

        let request = ChatRequest::from_prompt(prompt::build_grounded_prompt(query, &sources))
            .with_settings(&self.generation);
        let answer = self.llm.chat(request).await?;

        Ok(Solution { answer, sources })
    }

    /// Similarity candidates, code-boosted and cut to `top_k`.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<DocumentChunk>, ApiError> {
        let candidates = self
            .index
            .similarity_search(query, self.retrieval.candidate_k)
            .await?;
        let ranked = keyword::rank(query, candidates, self.retrieval.top_k);

        for (i, chunk) in ranked.iter().enumerate() {
            tracing::debug!(
                rank = i + 1,
                code = chunk.header(ERROR_CODE).unwrap_or("Unknown"),
                section = chunk.header(CATEGORY).unwrap_or("Unknown"),
                "Ranked chunk"
            );
        }

        Ok(ranked)
    }

    /// What the model says with no manual context at all.
    pub async fn get_baseline_response(&self, query: &str) -> String {
        match self.try_baseline(query).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::warn!("Baseline query failed: {}", err);
                format!("Error generating baseline: {}", err)
            }
        }
    }

    pub async fn try_baseline(&self, query: &str) -> Result<String, ApiError> {
        let request = ChatRequest::from_prompt(prompt::build_baseline_prompt(query))
            .with_settings(&self.generation);
        self.llm.chat(request).await
    }

    /// Grounded answer, and the baseline next to it when asked for.
    pub async fn compare(&self, query: &str, include_baseline: bool) -> Comparison {
        let grounded = self.get_solution(query).await;
        let baseline = if include_baseline {
            Some(self.get_baseline_response(query).await)
        } else {
            None
        };
        Comparison { grounded, baseline }
    }
}
