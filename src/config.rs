use std::path::PathBuf;

use crate::llm::LLMConfig;
use crate::memory::ExtractionKeywords;

pub const DATA_PATH: &str = "data";
pub const DB_PATH: &str = "vector_db";
pub const CHUNK_SIZE: usize = 800;
pub const CHUNK_OVERLAP: usize = 100;
pub const TOP_K: usize = 4;

/// Pages pulled in by `ingest-urls` when no addresses are given
pub const DEFAULT_URLS: &[&str] =
    &["https://stackoverflow.com/questions/43170942/laptop-overheating-on-startup"];

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub data_dir: PathBuf,
    pub index_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub urls: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DATA_PATH),
            index_dir: PathBuf::from(DB_PATH),
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
            urls: DEFAULT_URLS.iter().map(|u| u.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: TOP_K }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssistantConfig {
    pub ingest: IngestConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LLMConfig,
    pub keywords: ExtractionKeywords,
}

impl AssistantConfig {
    /// Defaults overlaid with `GROQ_*` variables from the process environment and `.env`.
    pub fn from_env() -> Self {
        // A missing .env file is fine, the variables may come from the shell
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GROQ_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Some(url) = non_empty("GROQ_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Some(model) = non_empty("GROQ_MODEL") {
            config.llm.model = model;
        }
        config
    }
}
