//! # ares-research - fan-out/fan-in multi-question research server
//!
//! Answers a natural-language request by splitting it into independent
//! sub-questions, researching each one concurrently (knowledge base lookup,
//! optional live web search, answer generation) and composing the answers
//! into one reply that is streamed to the caller token by token.
//!
//! ## Overview
//!
//! ares-research can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `ares-research` binary
//! 2. **As a library** - Embed the [`ResearchGraph`] in your own service
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use ares_research::{AppConfig, ResearchGraph, types::ChatMessage};
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load("ares.toml")?;
//!     let graph = Arc::new(ResearchGraph::from_config(&config).await?);
//!
//!     let mut frames = Box::pin(graph.stream(vec![ChatMessage::user(
//!         "What's new in Rust, and what is 2+2?",
//!     )]));
//!     while let Some(frame) = frames.next().await {
//!         print!("{}", frame.encode()?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI API support |
//! | `swagger-ui` | Interactive API docs at `/swagger-ui/` |
//!
//! ## Modules
//!
//! - [`research`] - Decomposer, question pipeline, merge reducer, synthesizer, graph
//! - [`stream`] - Output frames and the stream multiplexer
//! - [`llm`] - LLM client implementations
//! - [`rag`] - Knowledge-base retrieval
//! - [`tools`] - Web search
//! - [`api`] - REST API handlers and routes
//! - [`cli`] - Command-line interface
//! - [`types`] - Common types and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Knowledge-base retrieval.
pub mod rag;
/// Multi-question research graph.
pub mod research;
/// Output frames and stream multiplexing.
pub mod stream;
/// Web search tool.
pub mod tools;
/// Core types (requests, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use llm::{LLMClient, Provider, ProviderRegistry};
pub use research::{Collaborators, ResearchGraph};
pub use types::{AppError, Result};
pub use utils::toml_config::AppConfig;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded `ares.toml`
    pub config: Arc<AppConfig>,
    /// Research topology, built once at startup
    pub graph: Arc<ResearchGraph>,
}
