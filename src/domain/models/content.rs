//! Content records owned by the external persistence layer.
//!
//! Only the fields the retrieval core reads are modelled here.

use serde::{Deserialize, Serialize};

use super::embedding::EmbeddingStatus;

/// Publication state of a knowledge base document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            _ => None,
        }
    }
}

/// A knowledge base document as seen by the retrieval filter and the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: u64,
    pub knowledge_base_id: u64,
    pub title: String,
    pub content: String,
    pub status: PublishStatus,
    pub embedding_status: EmbeddingStatus,
}

impl DocumentRecord {
    pub fn is_published(&self) -> bool {
        self.status == PublishStatus::Published
    }
}

/// A FAQ entry. FAQs never belong to a knowledge base table row, so retrieval
/// never filters them by publication rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqRecord {
    pub id: u64,
    /// Optional grouping; indexed under `0` when absent.
    pub knowledge_base_id: Option<u64>,
    pub question: String,
    pub answer: String,
    pub embedding_status: EmbeddingStatus,
}

impl FaqRecord {
    /// Text indexed for this entry.
    pub fn indexed_text(&self) -> String {
        format!("{}\n{}", self.question, self.answer)
    }

    pub fn indexed_knowledge_base_id(&self) -> u64 {
        self.knowledge_base_id.unwrap_or(0)
    }
}

/// A knowledge base with its RAG participation flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseRecord {
    pub id: u64,
    pub name: String,
    pub rag_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_status_parse() {
        assert_eq!(PublishStatus::from_str("Published"), Some(PublishStatus::Published));
        assert_eq!(PublishStatus::from_str("draft"), Some(PublishStatus::Draft));
        assert_eq!(PublishStatus::from_str("archived"), None);
    }

    #[test]
    fn test_faq_indexed_text() {
        let faq = FaqRecord {
            id: 7,
            knowledge_base_id: None,
            question: "How do I reset my password?".into(),
            answer: "Use the forgot password link.".into(),
            embedding_status: EmbeddingStatus::Pending,
        };
        assert_eq!(
            faq.indexed_text(),
            "How do I reset my password?\nUse the forgot password link."
        );
        assert_eq!(faq.indexed_knowledge_base_id(), 0);
    }
}
