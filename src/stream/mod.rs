//! Output side of a research request.
//!
//! The graph writes [`StreamEvent`]s into an [`EventSink`]; [`into_frames`]
//! turns them into the ordered, deduplicated [`Frame`] sequence that the HTTP
//! layer and the CLI consume.

pub mod frame;
pub mod multiplexer;

pub use frame::{DATA_STREAM_HEADER, DATA_STREAM_VERSION, FinishPayload, Frame, StepAnnotation};
pub use multiplexer::{EventSink, Multiplexer, StreamEvent, into_frames};
