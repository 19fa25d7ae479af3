//! Shared test helpers.

#![allow(dead_code)]

pub mod mocks;

use ares_research::stream::Frame;
use ares_research::types::ChatMessage;
use ares_research::ResearchGraph;
use futures::StreamExt;
use std::sync::Arc;

/// Run one request through `graph` and collect every frame
pub async fn collect_frames(graph: Arc<ResearchGraph>, messages: Vec<ChatMessage>) -> Vec<Frame> {
    graph.stream(messages).collect().await
}

/// Concatenated `0:` payloads
pub fn text_of(frames: &[Frame]) -> String {
    frames
        .iter()
        .filter_map(|f| match f {
            Frame::Text(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}

/// Node names of all `8:` frames, in order
pub fn step_nodes(frames: &[Frame]) -> Vec<String> {
    frames
        .iter()
        .filter_map(|f| match f {
            Frame::Annotation(steps) => Some(steps.iter().map(|s| s.node.clone())),
            _ => None,
        })
        .flatten()
        .collect()
}
