use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use scraper::{Html, Node, Selector};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::utils::{source_files, SourceKind};

/// Raw text pulled from a file, a PDF page or a web page, before splitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

impl SourceDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Loads every `.pdf` and `.txt` file directly inside `dir`.
///
/// PDFs produce one document per page (zero-based `page` metadata), text
/// files one document each. Any unreadable file aborts the load.
pub fn load_directory(dir: impl AsRef<Path>) -> Result<Vec<SourceDocument>> {
    let mut documents = Vec::new();
    for (path, kind) in source_files(dir)? {
        match kind {
            SourceKind::Pdf => documents.extend(load_pdf(&path)?),
            SourceKind::Text => documents.push(load_text(&path)?),
        }
    }
    Ok(documents)
}

pub fn load_text(path: &Path) -> Result<SourceDocument> {
    let content = fs::read_to_string(path)?;
    Ok(SourceDocument::new(content).with_meta("source", path.display().to_string()))
}

pub fn load_pdf(path: &Path) -> Result<Vec<SourceDocument>> {
    let pdf = lopdf::Document::load(path)?;
    let mut pages = Vec::new();
    for (index, page_number) in pdf.get_pages().keys().enumerate() {
        let text = pdf.extract_text(&[*page_number])?;
        pages.push(
            SourceDocument::new(text)
                .with_meta("source", path.display().to_string())
                .with_meta("page", index.to_string()),
        );
    }
    Ok(pages)
}

/// Fetches each address in order and keeps the readable text of the page.
///
/// A failed request or a non-success status aborts the load.
pub async fn load_urls(client: &reqwest::Client, urls: &[String]) -> Result<Vec<SourceDocument>> {
    let mut documents = Vec::with_capacity(urls.len());
    for url in urls {
        info!("Loading {}", url);
        let body = client.get(url).send().await?.error_for_status()?.text().await?;
        documents.push(html_to_document(url, &body));
    }
    Ok(documents)
}

pub fn html_to_document(url: &str, html: &str) -> SourceDocument {
    let page = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| page.select(&sel).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let root = Selector::parse("body")
        .ok()
        .and_then(|sel| page.select(&sel).next())
        .unwrap_or_else(|| page.root_element());

    let mut lines = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        // Script and style bodies are text nodes too
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript"))
        });
        let trimmed = text.trim();
        if !hidden && !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }

    let mut document = SourceDocument::new(lines.join("\n")).with_meta("source", url);
    if !title.is_empty() {
        document = document.with_meta("title", title);
    }
    document
}
