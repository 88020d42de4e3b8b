//! Grounding context rendering and the augmented prompt template.

use crate::domain::models::SearchResult;

/// Render results as numbered passages separated by blank lines.
pub fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| format!("Passage {}:\n{}", i + 1, result.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Wrap the visitor's message with retrieved knowledge base passages.
pub fn build_grounded_prompt(user_message: &str, context: &str) -> String {
    format!(
        "You are a customer support assistant. Answer the user's question using the knowledge base content below.

Knowledge base content:
{context}

User question: {user_message}

Answer from the knowledge base content. If it does not contain the information needed, say so politely and suggest contacting a human agent.

Guidelines:
1. Give accurate, useful answers grounded in the knowledge base content
2. Quote and explain the relevant content when it exists
3. Be honest when the knowledge base has no relevant information
4. Keep a friendly, professional tone
5. Be concise"
    )
}
