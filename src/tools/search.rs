//! Web search collaborator backed by daedra
//!
//! daedra queries DuckDuckGo; results are flattened into one text block the
//! answer stage can paste into its context.

use crate::types::{AppError, Result};
use async_trait::async_trait;

/// Live web lookup used by the web-search stage
///
/// Only called for sub-questions that were flagged as needing current data.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Return result text for `query`, or `None` when the search found nothing
    async fn search(&self, query: &str) -> Result<Option<String>>;
}

/// Web search powered by daedra
pub struct DaedraSearch {
    num_results: usize,
}

impl DaedraSearch {
    pub fn new(num_results: usize) -> Self {
        Self { num_results }
    }
}

impl Default for DaedraSearch {
    fn default() -> Self {
        Self::new(5)
    }
}

/// One search hit, independent of the backend's response type
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub description: String,
}

/// Render hits as `title: description (url)` lines, or `None` if empty
pub fn format_hits(hits: &[SearchHit]) -> Option<String> {
    if hits.is_empty() {
        return None;
    }

    Some(
        hits.iter()
            .map(|hit| {
                if hit.description.trim().is_empty() {
                    format!("{} ({})", hit.title, hit.url)
                } else {
                    format!("{}: {} ({})", hit.title, hit.description.trim(), hit.url)
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

#[async_trait]
impl WebSearch for DaedraSearch {
    async fn search(&self, query: &str) -> Result<Option<String>> {
        let search_args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: self.num_results,
                ..Default::default()
            }),
        };

        let response = daedra::tools::search::perform_search(&search_args)
            .await
            .map_err(|e| AppError::Internal(format!("Search failed: {}", e)))?;

        let hits: Vec<SearchHit> = response
            .data
            .iter()
            .map(|r| SearchHit {
                title: r.title.clone(),
                url: r.url.clone(),
                description: r.description.clone(),
            })
            .collect();

        Ok(format_hits(&hits))
    }
}

/// Web search used when the feature is disabled; every lookup is a miss
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWebSearch;

#[async_trait]
impl WebSearch for NoWebSearch {
    async fn search(&self, _query: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
