//! Retrieval collaborator for the question pipeline.
//!
//! The research graph only needs one capability from a knowledge backend:
//! "give me context for this sub-question, if you have any". A miss is
//! `Ok(None)` and is normal; the answer stage falls back to general knowledge.
//!
//! # Module Structure
//!
//! - [`rag::search`](crate::rag::search) - BM25 lexical index
//! - [`rag::knowledge_base`](crate::rag::knowledge_base) - file-backed [`Retriever`]

use crate::types::Result;
use async_trait::async_trait;

pub mod knowledge_base;
pub mod search;

pub use knowledge_base::KnowledgeBase;

/// Knowledge-base lookup used by the retrieval stage
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return context text for `query`, or `None` when nothing relevant exists
    async fn retrieve(&self, query: &str) -> Result<Option<String>>;
}

/// Retriever used when retrieval is disabled; every lookup is a miss
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRetrieval;

#[async_trait]
impl Retriever for NoRetrieval {
    async fn retrieve(&self, _query: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
