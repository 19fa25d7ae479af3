//! Multi-Question Research Graph
//!
//! Answers a request by splitting it into independent sub-questions,
//! researching each one concurrently and merging the answers into a single
//! streamed reply.
//!
//! # Architecture
//!
//! ```text
//! request ─► Decomposer ─┬─► QuestionPipeline (q_0) ─┐
//!                        ├─► QuestionPipeline (q_1) ─┼─► merge ─► Synthesizer ─► tokens
//!                        └─► QuestionPipeline (q_n) ─┘
//! ```
//!
//! - [`decomposer::Decomposer`] - one structured completion call, request to sub-questions
//! - [`pipeline::QuestionPipeline`] - retrieval, conditional web search, answer
//! - [`state::SubQuestionCollection`] - identity-keyed merge reducer
//! - [`synthesizer::Synthesizer`] - streams the final reply
//! - [`coordinator::ResearchGraph`] - wires it all together and owns fan-out/fan-in
//!
//! # Usage
//!
//! ```ignore
//! use ares_research::research::{Collaborators, ResearchGraph};
//! use futures::StreamExt;
//!
//! let graph = Arc::new(ResearchGraph::new(collaborators, 8));
//! let mut frames = graph.stream(vec![ChatMessage::user("What is 2+2?")]);
//! while let Some(frame) = frames.next().await {
//!     print!("{}", frame.encode()?);
//! }
//! ```

/// Fan-out/fan-in orchestration.
pub mod coordinator;
/// Request decomposition and its schema.
pub mod decomposer;
/// Per-sub-question state machine.
pub mod pipeline;
/// Named graph stages and their UI labels.
pub mod stage;
/// Execution state and the merge reducer.
pub mod state;
/// Final answer composition.
pub mod synthesizer;

pub use coordinator::{Collaborators, ResearchGraph};
pub use decomposer::{Decomposer, SubQuestionSeed, parse_decomposition};
pub use pipeline::{QuestionPipeline, fallback_answer};
pub use stage::Stage;
pub use state::{ExecutionState, SubQuestion, SubQuestionCollection, SubQuestionId, SubQuestionUpdate};
pub use synthesizer::Synthesizer;
