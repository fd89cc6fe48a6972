use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::embedding::Embedder;
use crate::error::{AssistantError, Result};
use crate::loader::SourceDocument;
use crate::splitter::TextSplitter;
use crate::vector_db::{IndexStore, VectorDB};

/// Outcome of one ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    /// Entries in the index after the run, including appended-to ones
    pub total_entries: usize,
}

/// Splits, embeds and persists source documents into the vector index.
pub struct DocumentStoreBuilder {
    embedder: Arc<dyn Embedder>,
    store: Arc<IndexStore>,
    splitter: TextSplitter,
}

impl DocumentStoreBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<IndexStore>, splitter: TextSplitter) -> Self {
        DocumentStoreBuilder {
            embedder,
            store,
            splitter,
        }
    }

    /// Rebuilds the index from `documents`, or adds to the existing one when `append` is set.
    ///
    /// The index on disk is only replaced once every chunk has been embedded.
    pub fn build(&self, documents: &[SourceDocument], append: bool) -> Result<IngestReport> {
        let chunks = self.splitter.split_documents(documents);
        info!("Split {} documents into {} chunks", documents.len(), chunks.len());

        let mut db = if append {
            self.existing_index()?
        } else {
            VectorDB::new(self.embedder.model_id(), self.embedder.dimension())
        };

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        if embeddings.len() != chunks.len() {
            return Err(AssistantError::Embedding(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            db.add_document(chunk.content, chunk.metadata, embedding)?;
        }

        self.store.replace(&db)?;
        info!("Vector index written to {}", self.store.dir().display());

        Ok(IngestReport {
            documents: documents.len(),
            chunks: texts.len(),
            total_entries: db.len(),
        })
    }

    fn existing_index(&self) -> Result<VectorDB> {
        match self.store.current()? {
            Some(db) if db.model_id() != self.embedder.model_id() => Err(AssistantError::ModelMismatch {
                index: db.model_id().to_string(),
                query: self.embedder.model_id().to_string(),
            }),
            Some(db) => Ok(db.as_ref().clone()),
            None => Ok(VectorDB::new(self.embedder.model_id(), self.embedder.dimension())),
        }
    }
}
