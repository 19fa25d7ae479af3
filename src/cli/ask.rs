//! Ask command implementation
//!
//! Runs one request through the research graph in-process and renders the
//! frame stream to the terminal.

use super::output::Output;
use crate::research::ResearchGraph;
use crate::stream::Frame;
use crate::types::{ChatMessage, Result};
use futures::StreamExt;
use std::sync::Arc;

/// How an `ask` run ended
#[derive(Debug, PartialEq, Eq)]
pub enum AskOutcome {
    /// The answer was streamed to completion
    Completed,
    /// The request failed with this message
    Failed(String),
}

/// Run `query` through `graph`, printing stages and the streamed answer.
///
/// With `raw` set every frame is printed exactly as it would go over the wire.
pub async fn run(
    graph: Arc<ResearchGraph>,
    query: &str,
    raw: bool,
    output: &Output,
) -> Result<AskOutcome> {
    let mut frames = Box::pin(graph.stream(vec![ChatMessage::user(query)]));
    let mut answer_started = false;

    while let Some(frame) = frames.next().await {
        if raw {
            print!("{}", frame.encode()?);
        }

        match frame {
            Frame::Annotation(steps) if !raw => {
                for step in steps {
                    output.stage(&step.label);
                }
            }
            Frame::Text(delta) if !raw => {
                if !answer_started {
                    output.newline();
                    answer_started = true;
                }
                output.token(&delta);
            }
            Frame::Finish(_) => {
                if !raw {
                    output.newline();
                }
                return Ok(AskOutcome::Completed);
            }
            Frame::Error(message) => return Ok(AskOutcome::Failed(message)),
            _ => {}
        }
    }

    Ok(AskOutcome::Failed("Stream ended unexpectedly".to_string()))
}
