use super::stage::Stage;
use super::state::{ExecutionState, SubQuestion};
use crate::llm::LLMClient;
use crate::stream::EventSink;
use crate::types::{AppError, ChatMessage, Result};
use futures::StreamExt;
use std::sync::Arc;

const SYNTHESIZER_PROMPT: &str = r#"You are a helpful assistant. You have researched and answered several sub-questions. Now compose one natural, flowing response that covers all of them.

Rules:
- Do NOT mechanically number the answers or repeat the sub-questions verbatim.
- Write like a helpful assistant having a natural conversation.
- Match the language of the user (if they wrote in Russian, respond in Russian).
- Keep the response focused and coherent."#;

/// `Q: ...\nA: ...` blocks for every answered record, in collection order
pub fn qa_context<'a>(questions: impl IntoIterator<Item = &'a SubQuestion>) -> String {
    questions
        .into_iter()
        .filter_map(|q| {
            q.answer
                .as_ref()
                .map(|answer| format!("Q: {}\nA: {}", q.question, answer))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Full message list for the synthesis call
pub fn synthesis_messages(state: &ExecutionState) -> Vec<ChatMessage> {
    let history = state.history();
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(SYNTHESIZER_PROMPT));
    messages.extend(history);
    messages.push(ChatMessage::user(format!(
        "Based on the following research, compose a unified response:\n\n{}",
        qa_context(state.sub_questions.iter())
    )));
    messages
}

/// Merges all sub-question answers into one streamed reply
pub struct Synthesizer {
    llm: Arc<dyn LLMClient>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    /// Stream the reply token by token into `sink` and return the full text.
    ///
    /// Completion errors become [`AppError::Synthesis`]; a closed sink is
    /// returned as is.
    pub async fn synthesize(&self, state: &ExecutionState, sink: &EventSink) -> Result<String> {
        let answered = state.sub_questions.answered().count();
        tracing::info!(answers = answered, "Merging answers into final response");
        if answered < state.sub_questions.len() {
            tracing::warn!(
                skipped = state.sub_questions.len() - answered,
                "Skipping sub-questions without an answer"
            );
        }

        sink.step(Stage::Synthesizer).await?;

        let messages = synthesis_messages(state);
        let mut tokens = self
            .llm
            .stream_with_history(&messages)
            .await
            .map_err(|e| AppError::Synthesis(e.to_string()))?;

        let mut response = String::new();
        while let Some(delta) = tokens.next().await {
            let delta = delta.map_err(|e| AppError::Synthesis(e.to_string()))?;
            if delta.is_empty() {
                continue;
            }
            response.push_str(&delta);
            sink.token(delta).await?;
        }

        tracing::info!(chars = response.chars().count(), "Synthesis complete");
        Ok(response)
    }
}
