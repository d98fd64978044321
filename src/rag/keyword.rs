//! Deterministic error-code boost for hybrid retrieval.
//!
//! Similarity search decides the candidate set; this module only reorders it.
//! Chunks whose text or headers contain a code named in the query move ahead
//! of the rest, and both groups keep their similarity order.

use std::sync::OnceLock;

use regex::Regex;

use super::document::DocumentChunk;

fn error_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // letters, optional hyphen, digits: E-101, s304, HW-1002
    RE.get_or_init(|| Regex::new(r"\b[A-Za-z]+-?\d+\b").expect("error code regex is valid"))
}

/// Every error-code token in `text`, as written.
pub fn extract_error_codes(text: &str) -> Vec<String> {
    error_code_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// `S-304`, `s304` and `S304` all normalize to `S304`.
pub fn normalize_code(code: &str) -> String {
    code.replace('-', "").to_uppercase()
}

/// Chunk text plus its serialized header mapping, normalized like codes.
pub fn search_blob(chunk: &DocumentChunk) -> String {
    let metadata = serde_json::to_string(&chunk.metadata).unwrap_or_default();
    normalize_code(&format!("{}{}", chunk.content, metadata))
}

pub fn matches_any_code(chunk: &DocumentChunk, normalized_codes: &[String]) -> bool {
    let blob = search_blob(chunk);
    normalized_codes.iter().any(|code| blob.contains(code.as_str()))
}

/// Stable partition: chunks matching any code first, the rest after.
pub fn prioritize(candidates: Vec<DocumentChunk>, codes: &[String]) -> Vec<DocumentChunk> {
    let normalized: Vec<String> = codes.iter().map(|c| normalize_code(c)).collect();
    let (mut priority, other): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|chunk| matches_any_code(chunk, &normalized));
    priority.extend(other);
    priority
}

/// Applies the code boost (if the query names any code) and keeps `top_k`.
pub fn rank(query: &str, candidates: Vec<DocumentChunk>, top_k: usize) -> Vec<DocumentChunk> {
    let codes = extract_error_codes(query);
    let mut ranked = if codes.is_empty() {
        candidates
    } else {
        tracing::debug!(codes = ?codes, "Detected error codes in query");
        prioritize(candidates, &codes)
    };
    ranked.truncate(top_k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::document::{HeaderMap, CATEGORY, ERROR_CODE};

    fn chunk(category: &str, code: &str, body: &str) -> DocumentChunk {
        let mut metadata = HeaderMap::new();
        metadata.insert(CATEGORY.to_string(), category.to_string());
        metadata.insert(ERROR_CODE.to_string(), code.to_string());
        DocumentChunk::new(format!("{} - {}\n\n{}", category, code, body), metadata)
    }

    fn codes_of(chunks: &[DocumentChunk]) -> Vec<&str> {
        chunks
            .iter()
            .map(|c| c.header(ERROR_CODE).unwrap_or(""))
            .collect()
    }

    #[test]
    fn extracts_codes_in_any_case_with_optional_hyphen() {
        let codes = extract_error_codes("I have error S-304 and E101 on HW-1002, also s304");
        assert_eq!(codes, vec!["S-304", "E101", "HW-1002", "s304"]);

        assert!(extract_error_codes("fiber link is flapping").is_empty());
        // no trailing word boundary after the digits
        assert!(extract_error_codes("Orbit-5G radio").is_empty());
    }

    #[test]
    fn normalization_is_case_and_hyphen_insensitive() {
        let forms = ["s304", "S-304", "S304", "s-304"];
        for form in forms {
            let extracted = extract_error_codes(form);
            assert_eq!(extracted.len(), 1);
            assert_eq!(normalize_code(&extracted[0]), "S304");
        }
    }

    #[test]
    fn matching_chunks_move_first_and_keep_relative_order() {
        let candidates = vec![
            chunk("Hardware Alarms", "E-101", "Power supply issue."),
            chunk("Software Alarms", "S-304", "Fiber degradation."),
            chunk("Hardware Alarms", "E-102", "Fan failure."),
            chunk("Software Alarms", "S-304b", "See S-304 first."),
        ];

        let ranked = prioritize(candidates, &["s304".to_string()]);

        assert_eq!(codes_of(&ranked), vec!["S-304", "S-304b", "E-101", "E-102"]);
    }

    #[test]
    fn code_present_only_in_metadata_still_counts() {
        let mut metadata = HeaderMap::new();
        metadata.insert(ERROR_CODE.to_string(), "HW-1002".to_string());
        let metadata_only = DocumentChunk::new("Replace the fan tray.", metadata);
        let unrelated = chunk("Software Alarms", "S-304", "Clean connectors.");

        let ranked = prioritize(vec![unrelated, metadata_only], &["hw1002".to_string()]);

        assert_eq!(ranked[0].content, "Replace the fan tray.");
    }

    #[test]
    fn rank_without_codes_keeps_similarity_order() {
        let candidates: Vec<DocumentChunk> = (1..=5)
            .map(|i| chunk("Connectivity Issues", &format!("C-{}", i), "Check backhaul."))
            .collect();

        let ranked = rank("backhaul keeps dropping", candidates.clone(), 3);

        assert_eq!(ranked, candidates[..3].to_vec());
    }

    #[test]
    fn rank_boosts_then_truncates() {
        let mut candidates: Vec<DocumentChunk> = (1..=9)
            .map(|i| chunk("Hardware Alarms", &format!("E-10{}", i), "Generic hardware step."))
            .collect();
        candidates.push(chunk("Hardware Alarms", "HW-1002", "Five-step fan tray procedure."));

        let ranked = rank("HW-1002 not working", candidates, 3);

        assert_eq!(ranked.len(), 3);
        assert_eq!(codes_of(&ranked), vec!["HW-1002", "E-101", "E-102"]);
    }

    #[test]
    fn rank_handles_fewer_candidates_than_top_k() {
        let ranked = rank("E-101", vec![chunk("Hardware Alarms", "E-101", "x")], 3);
        assert_eq!(ranked.len(), 1);
        assert!(rank("E-101", Vec::new(), 3).is_empty());
    }
}
