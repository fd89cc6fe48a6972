use std::sync::Arc;

use serde::Serialize;

use crate::error::{AssistantError, Result};
use crate::llm::LanguageModel;
use crate::retriever::{RetrievedChunk, Retriever};

/// Model reply plus the chunks that were placed in its prompt.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub docs_used: Vec<RetrievedChunk>,
}

/// Joins chunk texts with blank lines; empty when nothing was retrieved.
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "
You are an intelligent IT support assistant.

Guidelines:
- Use provided context if relevant.
- If context is insufficient, use general technical knowledge.
- Blend both naturally when applicable.
- Never mention documentation, databases, or sources.
- Avoid repeating previously suggested steps.
- Be conversational and professional.

Context:
{context}

User Input:
{question}

Helpful Response:
"
    )
}

pub struct AnswerAssembler {
    retriever: Retriever,
    llm: Arc<dyn LanguageModel>,
}

impl AnswerAssembler {
    pub fn new(retriever: Retriever, llm: Arc<dyn LanguageModel>) -> Self {
        AnswerAssembler { retriever, llm }
    }

    /// Retrieves context for `question`, prompts the model, and returns its reply.
    pub async fn ask_question(&self, question: &str) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(AssistantError::InvalidInput("question cannot be empty".into()));
        }

        let docs = self.retriever.retrieve(question)?;
        let prompt = build_prompt(&build_context(&docs), question);
        let answer = self.llm.complete(&prompt).await?;

        Ok(Answer {
            answer,
            docs_used: docs,
        })
    }
}
