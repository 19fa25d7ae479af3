//! API request handlers.

/// Chat streaming and health handlers.
pub mod chat;
