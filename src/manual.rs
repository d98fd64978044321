//! Synthetic troubleshooting manual, written by the LLM for demos and tests.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::llm::{ChatRequest, GenerationSettings, LlmProvider};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualSpec {
    pub device: String,
    pub os: String,
    pub sections: Vec<String>,
    pub codes_per_section: usize,
}

impl Default for ManualSpec {
    fn default() -> Self {
        Self {
            device: "Orbit-5G Base Station".to_string(),
            os: "NebulaOS".to_string(),
            sections: vec![
                "Hardware Alarms".to_string(),
                "Software Alarms".to_string(),
                "Connectivity Issues".to_string(),
            ],
            codes_per_section: 5,
        }
    }
}

impl ManualSpec {
    pub fn prompt(&self) -> String {
        let sections = self
            .sections
            .iter()
            .enumerate()
            .map(|(i, name)| {
                format!(
                    "{}. **{}**: Create {} distinct error codes or scenarios (e.g. 'E-101: Power Unit Failure').",
                    i + 1,
                    name,
                    self.codes_per_section
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a Senior Technical Writer and Solutions Architect for a telecommunications company.\n\
             Your task is to create a realistic **Troubleshooting Manual** for a fictional device called the **'{device}'** running **'{os}'**.\n\
             \n\
             The output **must** be valid Markdown. Use `#` for the title, `##` for each section and `###` for each error code.\n\
             \n\
             Structure the manual into exactly these {count} sections:\n\
             {sections}\n\
             \n\
             For **EACH** error code or scenario, you must provide:\n\
             *   **Description**: A technical explanation of what went wrong.\n\
             *   **Resolution Procedure**: A numbered list of steps to resolve the issue. Be specific and technical (e.g., \"Check voltage at test point TP4\", \"Run command `nebula-cli reset-interface`\").\n\
             \n\
             Do not include any conversational filler. Output ONLY the Markdown content starting with the title.\n",
            device = self.device,
            os = self.os,
            count = self.sections.len(),
            sections = sections,
        )
    }
}

pub struct ManualGenerator {
    llm: Arc<dyn LlmProvider>,
    generation: GenerationSettings,
}

impl ManualGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, generation: GenerationSettings) -> Self {
        Self { llm, generation }
    }

    pub async fn generate(&self, spec: &ManualSpec) -> Result<String, ApiError> {
        tracing::info!(device = %spec.device, model = self.llm.model(), "Generating manual");
        let request = ChatRequest::from_prompt(spec.prompt()).with_settings(&self.generation);
        let raw = self.llm.chat(request).await?;

        let manual = strip_markdown_fence(&raw);
        if manual.trim().is_empty() {
            return Err(ApiError::Upstream("Model returned an empty manual".to_string()));
        }
        Ok(manual)
    }

    /// Generates the manual and writes it to `path`, creating parent dirs.
    pub async fn generate_to(&self, spec: &ManualSpec, path: &Path) -> Result<usize, ApiError> {
        let manual = self.generate(spec).await?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(ApiError::internal)?;
            }
        }
        tokio::fs::write(path, manual.as_bytes())
            .await
            .map_err(ApiError::internal)?;

        tracing::info!("Manual saved to {}", path.display());
        Ok(manual.len())
    }
}

/// Models like to wrap the whole answer in a ```markdown fence, which would
/// hide every heading from the chunker.
pub fn strip_markdown_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(first_newline) = trimmed.find('\n') else {
        return raw.to_string();
    };
    let opening = trimmed[..first_newline].trim();
    let is_fence = opening == "```" || opening.eq_ignore_ascii_case("```markdown") || opening == "```md";
    if !is_fence || !trimmed.ends_with("```") {
        return raw.to_string();
    }

    let inner = &trimmed[first_newline + 1..trimmed.len() - 3];
    format!("{}\n", inner.trim_end())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::types::ProviderModel;

    struct CannedLlm {
        reply: String,
        seen: Mutex<Option<String>>,
    }

    #[async_trait]
    impl LlmProvider for CannedLlm {
        fn name(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "canned-1"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn list_models(&self) -> Result<Vec<ProviderModel>, ApiError> {
            Ok(Vec::new())
        }

        async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
            *self.seen.lock().unwrap() = request.messages.first().map(|m| m.content.clone());
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn prompt_names_device_os_and_sections() {
        let prompt = ManualSpec::default().prompt();

        assert!(prompt.contains("'Orbit-5G Base Station'"));
        assert!(prompt.contains("'NebulaOS'"));
        assert!(prompt.contains("exactly these 3 sections"));
        assert!(prompt.contains("3. **Connectivity Issues**: Create 5 distinct"));
        assert!(prompt.contains("**Resolution Procedure**"));
    }

    #[test]
    fn strips_only_a_surrounding_fence() {
        assert_eq!(
            strip_markdown_fence("```markdown\n# Guide\n## Alarms\n```"),
            "# Guide\n## Alarms\n"
        );
        assert_eq!(strip_markdown_fence("```\n# Guide\n```\n"), "# Guide\n");

        let inner_fence = "# Guide\n```bash\nnebula-cli reset\n```";
        assert_eq!(strip_markdown_fence(inner_fence), inner_fence);
        assert_eq!(strip_markdown_fence("# Guide"), "# Guide");
    }

    #[tokio::test]
    async fn generate_to_writes_the_unfenced_manual() {
        let llm = Arc::new(CannedLlm {
            reply: "```markdown\n# Orbit-5G\n## Hardware Alarms\n### E-101\n1. Reseat PSU.\n```".to_string(),
            seen: Mutex::new(None),
        });
        let generator = ManualGenerator::new(llm.clone(), GenerationSettings::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/manuals/orbit_5g_guide.md");
        generator
            .generate_to(&ManualSpec::default(), &path)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Orbit-5G\n"));
        assert!(!written.contains("```"));
        assert!(llm.seen.lock().unwrap().as_deref().unwrap().contains("NebulaOS"));
    }

    #[tokio::test]
    async fn empty_model_output_is_an_upstream_error() {
        let generator = ManualGenerator::new(
            Arc::new(CannedLlm {
                reply: "  \n".to_string(),
                seen: Mutex::new(None),
            }),
            GenerationSettings::default(),
        );

        let err = generator.generate(&ManualSpec::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }
}
