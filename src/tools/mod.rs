//! External lookup tools used by the question pipeline.
//!
//! # Module Structure
//!
//! - [`search`](crate::tools::search) - Web search integration (DuckDuckGo via daedra)

/// Web search tool using DuckDuckGo.
pub mod search;

pub use search::{DaedraSearch, NoWebSearch, WebSearch};
