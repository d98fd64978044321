use super::document::DocumentChunk;

/// What the model is told to say when the context has no procedure.
pub const FALLBACK_ANSWER: &str = "Procedure not found in standard operating manual.";

/// Returned without calling the model when retrieval finds nothing.
pub const NO_RESULTS_ANSWER: &str = "No relevant information found.";

/// Numbered context block, chunks separated by `---`.
pub fn build_context_block(chunks: &[DocumentChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("Context Chunk {}:\n{}\n", i + 1, chunk.content))
        .collect::<Vec<_>>()
        .join("\n---\n")
}

pub fn build_grounded_prompt(query: &str, chunks: &[DocumentChunk]) -> String {
    format!(
        "You are a Level 3 Field Engineer.\n\
         Use ONLY the context below to answer.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {query}\n\
         \n\
         If the answer is not in the context, say \"{fallback}\"\n",
        context = build_context_block(chunks),
        query = query,
        fallback = FALLBACK_ANSWER,
    )
}

pub fn build_baseline_prompt(query: &str) -> String {
    format!(
        "You are a helpful technical support assistant.\n\
         The user is asking a technical question about a telecom base station.\n\
         Question: {}\n\
         Provide a technical resolution step-by-step.\n",
        query
    )
}

/// True when the model signalled that the context holds no answer.
pub fn is_fallback(answer: &str) -> bool {
    let trimmed = answer.trim().trim_matches('"');
    trimmed == FALLBACK_ANSWER
        || trimmed.trim_end_matches('.') == FALLBACK_ANSWER.trim_end_matches('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::document::HeaderMap;

    fn chunks() -> Vec<DocumentChunk> {
        vec![
            DocumentChunk::new("Hardware Alarms - HW-1002\n\nSwap fan tray.", HeaderMap::new()),
            DocumentChunk::new("Software Alarms - S-304\n\nClean connector.", HeaderMap::new()),
        ]
    }

    #[test]
    fn context_block_numbers_and_separates_chunks() {
        assert_eq!(
            build_context_block(&chunks()),
            "Context Chunk 1:\nHardware Alarms - HW-1002\n\nSwap fan tray.\n\
             \n---\n\
             Context Chunk 2:\nSoftware Alarms - S-304\n\nClean connector.\n"
        );
        assert_eq!(build_context_block(&[]), "");
    }

    #[test]
    fn grounded_prompt_restricts_to_context_and_names_fallback() {
        let prompt = build_grounded_prompt("HW-1002 not working", &chunks());

        assert!(prompt.starts_with("You are a Level 3 Field Engineer."));
        assert!(prompt.contains("Use ONLY the context below to answer."));
        assert!(prompt.contains("Context Chunk 2:\nSoftware Alarms - S-304"));
        assert!(prompt.contains("Question: HW-1002 not working\n"));
        assert!(prompt.contains(
            "say \"Procedure not found in standard operating manual.\""
        ));
    }

    #[test]
    fn baseline_prompt_carries_no_context() {
        let prompt = build_baseline_prompt("HW-1002 not working");

        assert!(prompt.contains("helpful technical support assistant"));
        assert!(prompt.contains("telecom base station"));
        assert!(prompt.contains("Question: HW-1002 not working"));
        assert!(!prompt.contains("Context"));
    }

    #[test]
    fn fallback_detection_tolerates_quotes_and_whitespace() {
        assert!(is_fallback(FALLBACK_ANSWER));
        assert!(is_fallback("  \"Procedure not found in standard operating manual.\"\n"));
        assert!(is_fallback("Procedure not found in standard operating manual"));
        assert!(!is_fallback("1. Swap the fan tray."));
    }
}
