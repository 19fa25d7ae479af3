use crate::llm::LLMClient;
use crate::types::{AppError, ChatMessage, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const DECOMPOSER_PROMPT: &str = r#"You are a query decomposer. Split the user's message into clear, individual sub-questions that can be answered independently.

Rules:
- Be conservative. Prefer fewer, well-scoped questions over over-splitting.
- If the user message is already a single simple question, return an array with one item.
- Set needsWebData=true ONLY when the question clearly requires current/real-time information: trends, prices, news, recent events, live data.
- Set needsWebData=false for general knowledge, how-to questions, and factual questions that don't change over time."#;

/// One sub-question as produced by the decomposer, before it gets an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubQuestionSeed {
    /// A clear, self-contained sub-question
    pub question: String,
    /// True only when the question clearly requires current/real-time info:
    /// trends, prices, news, recent events, dates
    #[serde(rename = "needsWebData")]
    pub needs_web_data: bool,
}

/// Structured output expected from the decomposition call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DecompositionOutput {
    pub questions: Vec<SubQuestionSeed>,
}

/// JSON schema handed to the model for the decomposition call
pub fn decomposition_schema() -> Result<Value> {
    serde_json::to_value(schemars::schema_for!(DecompositionOutput))
        .map_err(|e| AppError::Internal(format!("Failed to build decomposition schema: {}", e)))
}

/// Validate a structured reply into a non-empty list of seeds.
///
/// Any shape mismatch, an empty list or a blank question is a
/// [`AppError::SchemaValidation`] error.
pub fn parse_decomposition(value: Value) -> Result<Vec<SubQuestionSeed>> {
    let output: DecompositionOutput = serde_json::from_value(value)
        .map_err(|e| AppError::SchemaValidation(format!("Invalid decomposition: {}", e)))?;

    if output.questions.is_empty() {
        return Err(AppError::SchemaValidation(
            "Decomposition returned no questions".to_string(),
        ));
    }

    output
        .questions
        .into_iter()
        .enumerate()
        .map(|(i, seed)| {
            let question = seed.question.trim();
            if question.is_empty() {
                return Err(AppError::SchemaValidation(format!(
                    "Question {} is blank",
                    i
                )));
            }
            Ok(SubQuestionSeed {
                question: question.to_string(),
                needs_web_data: seed.needs_web_data,
            })
        })
        .collect()
}

/// Splits the active query into independently answerable sub-questions
pub struct Decomposer {
    llm: Arc<dyn LLMClient>,
}

impl Decomposer {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    /// Run the single structured completion call for `query`.
    ///
    /// Every failure is reported as [`AppError::Decomposition`]; the request
    /// cannot continue without sub-questions.
    pub async fn decompose(&self, query: &str) -> Result<Vec<SubQuestionSeed>> {
        tracing::info!(query = %truncate(query, 120), "Decomposing request");

        let schema = decomposition_schema()?;
        let messages = [ChatMessage::system(DECOMPOSER_PROMPT), ChatMessage::user(query)];

        let seeds = self
            .llm
            .generate_structured(&messages, &schema)
            .await
            .and_then(parse_decomposition)
            .map_err(|e| AppError::Decomposition(e.to_string()))?;

        tracing::info!(count = seeds.len(), "Found sub-question(s)");
        for (i, seed) in seeds.iter().enumerate() {
            tracing::debug!(
                index = i,
                question = %seed.question,
                needs_web_data = seed.needs_web_data,
                "Sub-question"
            );
        }

        Ok(seeds)
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
