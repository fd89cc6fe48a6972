//! Conversational tech-support assistant backed by a retrieval-augmented
//! generation pipeline over a persisted vector index.

pub mod assembler;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod memory;
pub mod retriever;
pub mod session;
pub mod splitter;
pub mod utils;
pub mod vector_db;

pub use assembler::{Answer, AnswerAssembler};
pub use config::AssistantConfig;
pub use embedding::{Embedder, HashingEmbedder};
pub use error::{AssistantError, FailureKind, Result};
pub use ingest::{DocumentStoreBuilder, IngestReport};
pub use llm::{LanguageModel, LLMConfig, LLM};
pub use memory::{ConversationMemory, ExtractionKeywords, MemorySlot};
pub use retriever::{RetrievedChunk, Retriever};
pub use session::{Assistant, ChatMessage, ChatRole, Session, SessionStats};
pub use vector_db::{IndexStore, VectorDB};
