//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for the completion backends the
//! research graph depends on. Provider-specific implementations sit behind the
//! [`LLMClient`] trait so the decomposer, answer stage and synthesizer never
//! know which model they are talking to.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - A resolved provider + model + sampling parameters
//! - [`ProviderRegistry`] - Resolves named models from `ares.toml`
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `ollama` - Local Ollama server (default)
//! - `openai` - OpenAI API and compatible endpoints
//!
//! # Streaming
//!
//! The synthesizer consumes [`LLMClient::stream_with_history`], which returns a
//! boxed stream of token deltas.

/// Core LLM client trait and provider selection.
pub mod client;
/// Registry resolving named models to providers.
pub mod provider_registry;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, ModelParams, Provider, TokenStream};
pub use provider_registry::ProviderRegistry;
