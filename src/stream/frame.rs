//! Line-framed data stream protocol (`x-vercel-ai-data-stream: v1`).
//!
//! Each record is `<tag>:<json>\n`:
//!
//! | Tag  | Payload                                   |
//! |------|-------------------------------------------|
//! | `0:` | JSON string, token delta                  |
//! | `8:` | JSON array of step annotations            |
//! | `d:` | JSON object, finish reason and usage      |
//! | `3:` | JSON string, error message                |

use crate::research::Stage;
use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Response header that advertises the protocol
pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";

/// Protocol version sent in [`DATA_STREAM_HEADER`]
pub const DATA_STREAM_VERSION: &str = "v1";

/// `{type: "step", node, label}` annotation carried by `8:` frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAnnotation {
    #[serde(rename = "type")]
    pub kind: String,
    pub node: String,
    pub label: String,
}

impl From<Stage> for StepAnnotation {
    fn from(stage: Stage) -> Self {
        Self {
            kind: "step".to_string(),
            node: stage.node().to_string(),
            label: stage.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishPayload {
    pub finish_reason: String,
    pub usage: Usage,
}

impl FinishPayload {
    /// Normal end of message. Token usage is not tracked and reported as zero.
    pub fn stop() -> Self {
        Self {
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }
}

/// One record of the output stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Annotation(Vec<StepAnnotation>),
    Finish(FinishPayload),
    Error(String),
}

impl Frame {
    pub fn tag(&self) -> &'static str {
        match self {
            Frame::Text(_) => "0",
            Frame::Annotation(_) => "8",
            Frame::Finish(_) => "d",
            Frame::Error(_) => "3",
        }
    }

    /// Whether nothing may follow this frame
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Finish(_) | Frame::Error(_))
    }

    /// Encode as one protocol line, trailing newline included
    pub fn encode(&self) -> Result<String> {
        let payload = match self {
            Frame::Text(text) => serde_json::to_string(text),
            Frame::Annotation(steps) => serde_json::to_string(steps),
            Frame::Finish(finish) => serde_json::to_string(finish),
            Frame::Error(message) => serde_json::to_string(message),
        }
        .map_err(|e| AppError::Stream(format!("Failed to encode frame: {}", e)))?;

        Ok(format!("{}:{}\n", self.tag(), payload))
    }

    /// Parse one protocol line; a trailing newline is allowed
    pub fn parse(line: &str) -> Result<Frame> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let (tag, payload) = line
            .split_once(':')
            .ok_or_else(|| AppError::Stream(format!("Malformed frame: {}", line)))?;

        let invalid =
            |e: serde_json::Error| AppError::Stream(format!("Invalid {} payload: {}", tag, e));
        match tag {
            "0" => serde_json::from_str(payload).map(Frame::Text).map_err(invalid),
            "8" => serde_json::from_str(payload)
                .map(Frame::Annotation)
                .map_err(invalid),
            "d" => serde_json::from_str(payload).map(Frame::Finish).map_err(invalid),
            "3" => serde_json::from_str(payload).map(Frame::Error).map_err(invalid),
            other => Err(AppError::Stream(format!("Unknown frame tag: {}", other))),
        }
    }
}
