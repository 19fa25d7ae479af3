use serde::{Deserialize, Serialize};
use std::fmt;

/// A named step of the research graph, reported to the caller once per request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decomposer,
    QuestionPipeline,
    Retrieval,
    WebSearch,
    AnswerGenerator,
    Synthesizer,
}

impl Stage {
    /// Every stage in graph order
    pub const ALL: [Stage; 6] = [
        Stage::Decomposer,
        Stage::QuestionPipeline,
        Stage::Retrieval,
        Stage::WebSearch,
        Stage::AnswerGenerator,
        Stage::Synthesizer,
    ];

    /// Node name as it appears on the wire
    pub fn node(&self) -> &'static str {
        match self {
            Stage::Decomposer => "decomposer",
            Stage::QuestionPipeline => "question_pipeline",
            Stage::Retrieval => "retrieval",
            Stage::WebSearch => "web_search",
            Stage::AnswerGenerator => "answer_generator",
            Stage::Synthesizer => "synthesizer",
        }
    }

    /// Human-readable label shown in the UI step pane
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Decomposer => "Analysing your question",
            Stage::QuestionPipeline => "Researching",
            Stage::Retrieval => "Checking knowledge base",
            Stage::WebSearch => "Searching the web",
            Stage::AnswerGenerator => "Generating answers",
            Stage::Synthesizer => "Composing response",
        }
    }

    pub fn from_node(node: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.node() == node)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.node())
    }
}
