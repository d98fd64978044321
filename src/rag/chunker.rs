//! Context-aware chunking of troubleshooting manuals.
//!
//! The manual is split at every configured Markdown heading, so no chunk spans
//! two leaf headings. Each chunk then gets its enclosing Category and
//! Error_Code prepended, because the embedding only ever sees chunk content.

use serde::{Deserialize, Serialize};

use super::document::{header_context, DocumentChunk, HeaderMap, CATEGORY, ERROR_CODE, TITLE};

/// Configuration for header-based splitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Heading marker (`#`, `##`, ...) and the header name it fills.
    pub headers: Vec<(String, String)>,
    /// Drop the heading line itself from each chunk body.
    pub strip_headers: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            headers: vec![
                ("#".to_string(), TITLE.to_string()),
                ("##".to_string(), CATEGORY.to_string()),
                ("###".to_string(), ERROR_CODE.to_string()),
            ],
            strip_headers: false,
        }
    }
}

/// A slice of the manual between two headings, before injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualSection {
    pub body: String,
    pub metadata: HeaderMap,
}

#[derive(Debug, Clone)]
struct Heading {
    level: usize,
    name: String,
    value: String,
}

pub struct HeaderChunker {
    config: ChunkerConfig,
    /// Longest marker first so `###` is not mistaken for `#`.
    markers: Vec<(String, String)>,
}

impl HeaderChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        let mut markers = config.headers.clone();
        markers.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { config, markers }
    }

    /// Splits and injects header context; the result is ready for embedding.
    pub fn chunk(&self, text: &str) -> Vec<DocumentChunk> {
        self.split(text)
            .into_iter()
            .map(|section| inject_header_context(&section))
            .collect()
    }

    /// Splits the manual at heading boundaries.
    ///
    /// With `strip_headers` off, the section bodies concatenate back to `text`.
    pub fn split(&self, text: &str) -> Vec<ManualSection> {
        let mut sections = Vec::new();
        let mut stack: Vec<Heading> = Vec::new();

        let mut section_start = 0usize;
        let mut body_start = 0usize;
        let mut section_metadata = HeaderMap::new();
        let mut fence: Option<String> = None;
        let mut offset = 0usize;

        for line in text.split_inclusive('\n') {
            let line_start = offset;
            offset += line.len();
            let trimmed = line.trim();

            if let Some(open) = fence.as_deref() {
                if trimmed.starts_with(open) {
                    fence = None;
                }
                continue;
            }
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                fence = Some(trimmed[..3].to_string());
                continue;
            }

            let Some(heading) = self.parse_heading(trimmed) else {
                continue;
            };

            self.push_section(
                &mut sections,
                text,
                section_start,
                body_start,
                line_start,
                &section_metadata,
            );

            stack.retain(|open| open.level < heading.level);
            stack.push(heading);

            section_start = line_start;
            body_start = offset;
            section_metadata = stack
                .iter()
                .map(|h| (h.name.clone(), h.value.clone()))
                .collect();
        }

        self.push_section(
            &mut sections,
            text,
            section_start,
            body_start,
            text.len(),
            &section_metadata,
        );

        sections
    }

    fn push_section(
        &self,
        sections: &mut Vec<ManualSection>,
        text: &str,
        section_start: usize,
        body_start: usize,
        end: usize,
        metadata: &HeaderMap,
    ) {
        let is_preamble = section_start == 0 && body_start == 0;
        if is_preamble && end == 0 {
            return;
        }

        let start = if self.config.strip_headers {
            body_start
        } else {
            section_start
        };

        sections.push(ManualSection {
            body: text[start..end].to_string(),
            metadata: metadata.clone(),
        });
    }

    fn parse_heading(&self, trimmed: &str) -> Option<Heading> {
        self.markers.iter().find_map(|(marker, name)| {
            let rest = trimmed.strip_prefix(marker.as_str())?;
            if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
                return None;
            }
            Some(Heading {
                level: marker.len(),
                name: name.clone(),
                value: rest.trim().to_string(),
            })
        })
    }
}

impl Default for HeaderChunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

/// Prepends `"<Category> - <Error_Code>\n\n"` to the section body.
pub fn inject_header_context(section: &ManualSection) -> DocumentChunk {
    let content = format!("{}\n\n{}", header_context(&section.metadata), section.body);
    DocumentChunk::new(content, section.metadata.clone())
}
