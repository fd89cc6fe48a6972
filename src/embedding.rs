use std::hash::{Hash, Hasher};

use lazy_static::lazy_static;
use ndarray::Array1;
use regex::Regex;
use rustc_hash::{FxHashSet, FxHasher};
use unicode_normalization::UnicodeNormalization;

use crate::error::{AssistantError, Result};

pub const HASHING_DIMENSION: usize = 384;

/// Maps text to a fixed-size vector.
///
/// Ingestion and retrieval must share one implementation; the index records
/// `model_id()` and refuses queries from a different one.
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Array1<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Array1<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

lazy_static! {
    static ref STOP_WORDS: FxHashSet<&'static str> = {
        let words = vec![
            "a", "an", "and", "are", "as", "at", "be", "by", "for", "from",
            "has", "he", "in", "is", "it", "its", "of", "on", "that", "the",
            "to", "was", "were", "will", "with"
        ];
        words.into_iter().collect()
    };
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").expect("static pattern");
}

/// NFC-normalizes, lower-cases, strips punctuation and drops stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    let text = text.nfc().collect::<String>().to_lowercase();
    let text = NON_WORD.replace_all(&text, " ");

    text.split_whitespace()
        .filter(|&token| !STOP_WORDS.contains(token))
        .map(|token| token.to_string())
        .collect()
}

/// Term-frequency vectors with the hashing trick.
///
/// Each token is hashed into one of `dimension` buckets with a hash-derived
/// sign, so vectors have a fixed size independent of any vocabulary and two
/// runs over the same text always agree.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    /// Fails with `InvalidInput` when `dimension` is zero.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(AssistantError::InvalidInput(
                "embedding dimension must be positive".into(),
            ));
        }
        Ok(Self::with_dimension(dimension))
    }

    fn with_dimension(dimension: usize) -> Self {
        HashingEmbedder {
            dimension,
            model_id: format!("hashing-fx-{}", dimension),
        }
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let mut hasher = FxHasher::default();
        token.hash(&mut hasher);
        let hash = hasher.finish();
        let index = (hash % self.dimension as u64) as usize;
        let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::with_dimension(HASHING_DIMENSION)
    }
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Array1<f32>> {
        let tokens = tokenize(text);
        let mut vector = Array1::<f32>::zeros(self.dimension);
        if tokens.is_empty() {
            return Ok(vector);
        }

        // Normalized term frequencies
        let weight = 1.0 / tokens.len() as f32;
        for token in &tokens {
            let (index, sign) = self.bucket(token);
            vector[index] += sign * weight;
        }
        Ok(vector)
    }
}

#[cfg(feature = "minilm")]
pub use minilm::MiniLmEmbedder;

#[cfg(feature = "minilm")]
mod minilm {
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use ndarray::Array1;

    use super::Embedder;
    use crate::error::{AssistantError, Result};

    pub const MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

    /// all-MiniLM-L6-v2 run locally through ONNX; downloads weights on first use.
    pub struct MiniLmEmbedder {
        model: TextEmbedding,
    }

    impl MiniLmEmbedder {
        pub fn new() -> Result<Self> {
            let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
                .map_err(|e| AssistantError::Embedding(e.to_string()))?;
            Ok(Self { model })
        }
    }

    impl Embedder for MiniLmEmbedder {
        fn model_id(&self) -> &str {
            MODEL_ID
        }

        fn dimension(&self) -> usize {
            384
        }

        fn embed(&self, text: &str) -> Result<Array1<f32>> {
            let mut vectors = self.embed_batch(&[text.to_string()])?;
            vectors
                .pop()
                .ok_or_else(|| AssistantError::Embedding("model returned no vector".into()))
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Array1<f32>>> {
            let vectors = self
                .model
                .embed(texts.to_vec(), None)
                .map_err(|e| AssistantError::Embedding(e.to_string()))?;
            Ok(vectors.into_iter().map(Array1::from).collect())
        }
    }
}
