use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::embedding::Embedder;
use crate::error::{AssistantError, Result};
use crate::vector_db::IndexStore;

/// A chunk returned for a query, with its cosine similarity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    pub score: f32,
}

pub struct Retriever {
    store: Arc<IndexStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<IndexStore>, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Retriever {
            store,
            embedder,
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Top-k chunks for `query`. An index that was never built yields no chunks.
    pub fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        let Some(db) = self.store.current()? else {
            debug!("No vector index at {}", self.store.dir().display());
            return Ok(Vec::new());
        };
        if db.is_empty() {
            return Ok(Vec::new());
        }

        if db.model_id() != self.embedder.model_id() {
            return Err(AssistantError::ModelMismatch {
                index: db.model_id().to_string(),
                query: self.embedder.model_id().to_string(),
            });
        }

        let query_embedding = self.embedder.embed(query)?;
        let chunks: Vec<RetrievedChunk> = db
            .search_similar(&query_embedding, self.top_k)?
            .into_iter()
            .map(|(score, doc)| RetrievedChunk {
                content: doc.content.clone(),
                metadata: doc.metadata.clone(),
                score,
            })
            .collect();

        debug!("Retrieved {} chunks", chunks.len());
        Ok(chunks)
    }
}
