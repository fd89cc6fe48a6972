use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use ndarray::Array1;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{AssistantError, Result};
use crate::utils::ensure_dir;

pub const INDEX_FILE: &str = "index.json";

/// One stored chunk: its text, where it came from, and its vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    pub embedding: Array1<f32>,
}

/// Flat cosine-similarity index over chunk embeddings.
///
/// Entries keep insertion order, which is the order the splitter produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDB {
    model_id: String,
    dimension: usize,
    documents: Vec<Document>,
}

impl VectorDB {
    pub fn new(model_id: impl Into<String>, dimension: usize) -> Self {
        VectorDB {
            model_id: model_id.into(),
            dimension,
            documents: Vec::new(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn add_document(
        &mut self,
        content: String,
        metadata: BTreeMap<String, String>,
        embedding: Array1<f32>,
    ) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(AssistantError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.documents.push(Document {
            id,
            content,
            metadata,
            embedding,
        });
        Ok(())
    }

    /// Returns up to `top_k` documents, most similar first, with their scores.
    pub fn search_similar(
        &self,
        query_embedding: &Array1<f32>,
        top_k: usize,
    ) -> Result<Vec<(f32, &Document)>> {
        if query_embedding.len() != self.dimension {
            return Err(AssistantError::DimensionMismatch {
                expected: self.dimension,
                actual: query_embedding.len(),
            });
        }

        let mut similarities: Vec<(f32, &Document)> = self
            .documents
            .iter()
            .map(|doc| (cosine_similarity(&doc.embedding, query_embedding), doc))
            .collect();

        // Stable sort: ties keep ingestion order
        similarities.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        similarities.truncate(top_k);
        Ok(similarities)
    }

    /// Writes the index to `dir/index.json` through a temp file and a rename,
    /// so readers never observe a half-written index.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        ensure_dir(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(dir.join(INDEX_FILE)).map_err(|e| e.error)?;
        Ok(())
    }

    /// Reads `dir/index.json`; `None` when no index has been written yet.
    pub fn load(dir: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = dir.as_ref().join(INDEX_FILE);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let db = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(db))
    }
}

fn cosine_similarity(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    let dot_product = a.dot(b);
    let norm_a = (a.dot(a)).sqrt();
    let norm_b = (b.dot(b)).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Identifies one on-disk version of the index file.
///
/// Every save renames a fresh temp file into place, so on Unix the inode
/// changes even when a rebuild lands within the mtime granularity with the
/// same size. Elsewhere two such rebuilds are indistinguishable until the
/// next save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
    #[cfg(unix)]
    inode: u64,
}

struct Loaded {
    stamp: FileStamp,
    db: Arc<VectorDB>,
}

/// Handle on the persisted index directory.
///
/// Keeps the last loaded index in memory and reloads it when the file on
/// disk has been replaced by an ingestion run.
pub struct IndexStore {
    dir: PathBuf,
    loaded: RwLock<Option<Loaded>>,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        IndexStore {
            dir: dir.into(),
            loaded: RwLock::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stamp(&self) -> Result<Option<FileStamp>> {
        match fs::metadata(self.dir.join(INDEX_FILE)) {
            Ok(meta) => Ok(Some(FileStamp {
                modified: meta.modified()?,
                len: meta.len(),
                #[cfg(unix)]
                inode: std::os::unix::fs::MetadataExt::ino(&meta),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The index as it is on disk right now, or `None` if nothing has been ingested.
    pub fn current(&self) -> Result<Option<Arc<VectorDB>>> {
        let Some(stamp) = self.stamp()? else {
            *self.loaded.write() = None;
            return Ok(None);
        };

        if let Some(loaded) = self.loaded.read().as_ref() {
            if loaded.stamp == stamp {
                return Ok(Some(Arc::clone(&loaded.db)));
            }
        }

        debug!("Loading vector index from {}", self.dir.display());
        let Some(db) = VectorDB::load(&self.dir)? else {
            *self.loaded.write() = None;
            return Ok(None);
        };
        let db = Arc::new(db);
        *self.loaded.write() = Some(Loaded {
            stamp,
            db: Arc::clone(&db),
        });
        Ok(Some(db))
    }

    /// Atomically replaces the index on disk.
    pub fn replace(&self, db: &VectorDB) -> Result<()> {
        db.save(&self.dir)?;
        // Force the next read to pick up the new file
        *self.loaded.write() = None;
        Ok(())
    }
}
