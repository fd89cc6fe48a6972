//! Error types for the support assistant

use thiserror::Error;

/// Every failure the ingestion and answer pipelines can produce
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The embedding function could not produce a vector
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Query vector and stored vectors disagree on size
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The persisted index was built with a different embedding model
    #[error("Index was built with embedding model '{index}', but '{query}' is in use")]
    ModelMismatch { index: String, query: String },

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Non-success status or unusable body from the language model API
    #[error("Model error: {0}")]
    Model(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a failed turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Retrieval,
    Model,
    InvalidInput,
    Other,
}

impl AssistantError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AssistantError::Embedding(_)
            | AssistantError::DimensionMismatch { .. }
            | AssistantError::ModelMismatch { .. }
            | AssistantError::Retrieval(_)
            | AssistantError::Serialization(_)
            | AssistantError::Io(_) => FailureKind::Retrieval,
            AssistantError::Model(_) | AssistantError::Http(_) => FailureKind::Model,
            AssistantError::InvalidInput(_) => FailureKind::InvalidInput,
            AssistantError::Pdf(_) | AssistantError::Config(_) => FailureKind::Other,
        }
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            AssistantError::Model("503".into()).kind(),
            FailureKind::Model
        );
        assert_eq!(
            AssistantError::DimensionMismatch { expected: 384, actual: 3 }.kind(),
            FailureKind::Retrieval
        );
        assert_eq!(
            AssistantError::InvalidInput("empty".into()).kind(),
            FailureKind::InvalidInput
        );
    }

    #[test]
    fn test_display_includes_detail() {
        let err = AssistantError::ModelMismatch {
            index: "hashing-fx-384".into(),
            query: "sentence-transformers/all-MiniLM-L6-v2".into(),
        };
        assert!(err.to_string().contains("hashing-fx-384"));
    }
}
