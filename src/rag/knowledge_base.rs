//! File-backed knowledge base.
//!
//! Every `.md` / `.txt` file under the configured directory is split into
//! paragraphs and indexed with BM25 at startup. The index is immutable after
//! loading, so lookups need no locking.

use super::Retriever;
use super::search::Bm25Index;
use crate::types::{AppError, Result};
use crate::utils::toml_config::RetrievalConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

/// BM25-backed [`Retriever`] over a directory of plain-text documents
pub struct KnowledgeBase {
    index: Bm25Index,
    passages: HashMap<String, String>,
    top_k: usize,
    min_score: f32,
}

impl KnowledgeBase {
    /// Create an empty knowledge base
    pub fn new(top_k: usize, min_score: f32) -> Self {
        Self {
            index: Bm25Index::new(),
            passages: HashMap::new(),
            top_k,
            min_score,
        }
    }

    /// Build a knowledge base from the `[research.retrieval]` section
    ///
    /// A missing directory is not an error: the knowledge base is simply empty
    /// and every lookup is a miss.
    pub fn from_config(config: &RetrievalConfig) -> Result<Self> {
        let mut kb = Self::new(config.top_k, config.min_score);
        if config.documents_dir.is_dir() {
            kb.load_dir(&config.documents_dir)?;
        } else {
            tracing::warn!(
                dir = %config.documents_dir.display(),
                "Knowledge base directory not found, retrieval will always miss"
            );
        }
        Ok(kb)
    }

    /// Index every supported file directly inside `dir`
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            AppError::Configuration(format!(
                "Failed to read knowledge base directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| AppError::Internal(format!("Failed to read directory entry: {}", e)))?
                .path();
            let supported = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| matches!(ext, "md" | "txt"));
            if path.is_file() && supported {
                files.push(path);
            }
        }
        files.sort();

        let mut added = 0;
        for path in &files {
            let content = std::fs::read_to_string(path).map_err(|e| {
                AppError::Internal(format!("Failed to read {}: {}", path.display(), e))
            })?;
            let source = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("document");
            added += self.add_document(source, &content);
        }

        tracing::info!(
            dir = %dir.display(),
            files = files.len(),
            passages = added,
            "Knowledge base loaded"
        );
        Ok(added)
    }

    /// Split `content` into paragraphs and index each one. Returns the number
    /// of passages added.
    pub fn add_document(&mut self, source: &str, content: &str) -> usize {
        let content = content.replace("\r\n", "\n");
        let mut added = 0;
        for (i, paragraph) in content
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .enumerate()
        {
            let id = format!("{}#{}", source, i);
            self.index.add_document(&id, paragraph);
            self.passages.insert(id, paragraph.to_string());
            added += 1;
        }
        added
    }

    /// Number of indexed passages
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Whether no passages are indexed
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    fn lookup(&self, query: &str) -> Option<String> {
        let hits: Vec<&str> = self
            .index
            .search(query, self.top_k)
            .into_iter()
            .filter(|(_, score)| *score >= self.min_score)
            .filter_map(|(id, _)| self.passages.get(&id).map(String::as_str))
            .collect();

        (!hits.is_empty()).then(|| hits.join("\n\n"))
    }
}

#[async_trait]
impl Retriever for KnowledgeBase {
    async fn retrieve(&self, query: &str) -> Result<Option<String>> {
        Ok(self.lookup(query))
    }
}
