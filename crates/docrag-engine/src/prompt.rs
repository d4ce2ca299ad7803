use docrag_core::types::RerankedResult;

const INSTRUCTIONS: &str = "You are an expert assistant for this document collection.\n\
Answer the question using only the CONTEXT below.\n\
If the CONTEXT does not contain the answer, say politely that you do not know.";

pub fn context_block(result: &RerankedResult) -> String {
    format!("source: {}\ncontent: {}", result.source, result.text)
}

/// Context blocks in rerank order, separated by a blank line.
pub fn build_context(results: &[RerankedResult]) -> String {
    results.iter().map(context_block).collect::<Vec<_>>().join("\n\n")
}

pub fn build_prompt(question: &str, results: &[RerankedResult]) -> String {
    format!(
        "{}\n\nCONTEXT:\n{}\n\nQUESTION: {}\n\nANSWER:",
        INSTRUCTIONS,
        build_context(results),
        question
    )
}
