use super::frame::{FinishPayload, Frame};
use crate::research::Stage;
use crate::types::{AppError, Result};
use async_stream::stream;
use futures::Stream;
use std::collections::HashSet;
use tokio::sync::mpsc;

/// Event produced by the research graph while a request runs
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Step(Stage),
    Token(String),
    Finish,
    Error(String),
}

/// Write side of a request's output channel.
///
/// Every send fails with [`AppError::Stream`] once the reader is gone, which
/// is how a caller disconnect reaches the graph.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSink {
    /// Create a bounded channel and its sink
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }

    async fn send(&self, event: StreamEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| AppError::Stream("Output channel closed".to_string()))
    }

    pub async fn step(&self, stage: Stage) -> Result<()> {
        self.send(StreamEvent::Step(stage)).await
    }

    pub async fn token(&self, delta: impl Into<String>) -> Result<()> {
        self.send(StreamEvent::Token(delta.into())).await
    }

    pub async fn finish(&self) -> Result<()> {
        self.send(StreamEvent::Finish).await
    }

    pub async fn fail(&self, message: impl Into<String>) -> Result<()> {
        self.send(StreamEvent::Error(message.into())).await
    }

    /// Resolves once the reader has been dropped
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Turns graph events into frames.
///
/// Step notifications are deduplicated by stage across all pipeline
/// instances, empty token deltas are dropped, and nothing is emitted after
/// the first terminal frame.
#[derive(Debug, Default)]
pub struct Multiplexer {
    seen: HashSet<Stage>,
    finished: bool,
}

impl Multiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, event: StreamEvent) -> Option<Frame> {
        if self.finished {
            return None;
        }

        match event {
            StreamEvent::Step(stage) => self
                .seen
                .insert(stage)
                .then(|| Frame::Annotation(vec![stage.into()])),
            StreamEvent::Token(delta) => (!delta.is_empty()).then_some(Frame::Text(delta)),
            StreamEvent::Finish => {
                self.finished = true;
                Some(Frame::Finish(FinishPayload::stop()))
            }
            StreamEvent::Error(message) => {
                self.finished = true;
                Some(Frame::Error(message))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Drain `rx` into an ordered frame stream that always ends with exactly one
/// terminal frame.
///
/// If every sender goes away without a terminal event, an error frame is
/// emitted so the caller never sees a silently truncated response.
pub fn into_frames(mut rx: mpsc::Receiver<StreamEvent>) -> impl Stream<Item = Frame> + Send {
    stream! {
        let mut mux = Multiplexer::new();
        while let Some(event) = rx.recv().await {
            if let Some(frame) = mux.accept(event) {
                yield frame;
            }
            if mux.is_finished() {
                break;
            }
        }
        if !mux.is_finished() {
            tracing::warn!("Event channel closed without a terminal event");
            yield Frame::Error("Stream ended unexpectedly".to_string());
        }
    }
}
