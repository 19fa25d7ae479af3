//! Mock collaborators for testing.
//!
//! Scripted LLM, retriever and web-search implementations with call
//! counters, shared across the integration test files.

#![allow(dead_code)]

use ares_research::llm::{LLMClient, TokenStream};
use ares_research::rag::Retriever;
use ares_research::tools::WebSearch;
use ares_research::types::{AppError, ChatMessage, MessageRole, Result};
use ares_research::{Collaborators, ResearchGraph};
use async_trait::async_trait;
use futures::stream;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// `(question, needsWebData)` pairs rendered as a decomposition reply
pub fn decomposition(questions: &[(&str, bool)]) -> Value {
    json!({
        "questions": questions
            .iter()
            .map(|(q, web)| json!({"question": q, "needsWebData": web}))
            .collect::<Vec<_>>()
    })
}

/// One answer-stage call as seen by the mock
#[derive(Debug, Clone)]
pub struct AnswerCall {
    pub system: String,
    pub prompt: String,
}

/// Mock LLM client scripted per call type.
///
/// - structured calls (decomposition) reply with `decomposition_reply`
/// - `generate_with_system` (answer stage) echoes the prompt's question
/// - `stream_with_history` (synthesis) streams `synthesis_tokens`
#[derive(Clone)]
pub struct MockLLMClient {
    decomposition_reply: Option<String>,
    answer_fail_all: bool,
    answer_blank: bool,
    answer_fail_for: Vec<String>,
    answer_delay: Option<Duration>,
    synthesis_tokens: Vec<String>,
    synthesis_fails: bool,
    synthesis_fails_after_tokens: bool,
    answer_calls: Arc<Mutex<Vec<AnswerCall>>>,
    synthesis_calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    answers_completed: Arc<AtomicUsize>,
}

impl MockLLMClient {
    /// Decompose into `questions` and synthesize `"Hello world"` in two tokens
    pub fn new(questions: &[(&str, bool)]) -> Self {
        Self {
            decomposition_reply: Some(decomposition(questions).to_string()),
            answer_fail_all: false,
            answer_blank: false,
            answer_fail_for: vec![],
            answer_delay: None,
            synthesis_tokens: vec!["Hello".to_string(), " world".to_string()],
            synthesis_fails: false,
            synthesis_fails_after_tokens: false,
            answer_calls: Arc::new(Mutex::new(vec![])),
            synthesis_calls: Arc::new(Mutex::new(vec![])),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            answers_completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Return `raw` verbatim as the decomposition reply
    pub fn with_raw_decomposition(mut self, raw: &str) -> Self {
        self.decomposition_reply = Some(raw.to_string());
        self
    }

    /// Make the decomposition call fail
    pub fn failing_decomposition(mut self) -> Self {
        self.decomposition_reply = None;
        self
    }

    pub fn failing_answers(mut self) -> Self {
        self.answer_fail_all = true;
        self
    }

    /// Answer every question with whitespace only
    pub fn with_blank_answers(mut self) -> Self {
        self.answer_blank = true;
        self
    }

    /// Fail answer calls whose prompt contains `needle`
    pub fn failing_answer_for(mut self, needle: &str) -> Self {
        self.answer_fail_for.push(needle.to_string());
        self
    }

    pub fn with_answer_delay(mut self, delay: Duration) -> Self {
        self.answer_delay = Some(delay);
        self
    }

    pub fn with_synthesis_tokens(mut self, tokens: &[&str]) -> Self {
        self.synthesis_tokens = tokens.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn failing_synthesis(mut self) -> Self {
        self.synthesis_fails = true;
        self
    }

    /// Stream the synthesis tokens, then fail
    pub fn failing_synthesis_mid_stream(mut self) -> Self {
        self.synthesis_fails_after_tokens = true;
        self
    }

    pub fn answer_calls(&self) -> Vec<AnswerCall> {
        self.answer_calls.lock().unwrap().clone()
    }

    pub fn synthesis_calls(&self) -> Vec<Vec<ChatMessage>> {
        self.synthesis_calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn answers_completed(&self) -> usize {
        self.answers_completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.answer_calls.lock().unwrap().push(AnswerCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.answer_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.answer_fail_all || self.answer_fail_for.iter().any(|n| prompt.contains(n)) {
            return Err(AppError::LLM("Mock answer failure".to_string()));
        }

        self.answers_completed.fetch_add(1, Ordering::SeqCst);
        if self.answer_blank {
            return Ok("  ".to_string());
        }
        let question = prompt.rsplit("Question: ").next().unwrap_or(prompt);
        Ok(format!("Answer to {}", question))
    }

    async fn generate_with_history(&self, messages: &[ChatMessage]) -> Result<String> {
        // Only the default `generate_structured` implementation lands here
        assert_eq!(messages[0].role, MessageRole::System);
        self.decomposition_reply
            .clone()
            .ok_or_else(|| AppError::LLM("Mock decomposition failure".to_string()))
    }

    async fn stream_with_history(&self, messages: &[ChatMessage]) -> Result<TokenStream> {
        self.synthesis_calls.lock().unwrap().push(messages.to_vec());

        if self.synthesis_fails {
            return Err(AppError::LLM("Mock synthesis failure".to_string()));
        }

        let mut items: Vec<Result<String>> =
            self.synthesis_tokens.iter().cloned().map(Ok).collect();
        if self.synthesis_fails_after_tokens {
            items.push(Err(AppError::LLM("Mock stream interrupted".to_string())));
        }
        Ok(Box::new(stream::iter(items)))
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Retriever that hits when the query contains one of its keywords
#[derive(Clone, Default)]
pub struct MockRetriever {
    entries: Vec<(String, String)>,
    fails: bool,
    panics_on: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockRetriever {
    /// Retriever that always misses
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, keyword: &str, passage: &str) -> Self {
        self.entries.push((keyword.to_lowercase(), passage.to_string()));
        self
    }

    pub fn failing() -> Self {
        Self {
            fails: true,
            ..Self::default()
        }
    }

    /// Panic inside `retrieve` when the query contains `needle`
    pub fn panicking_on(needle: &str) -> Self {
        Self {
            panics_on: Some(needle.to_lowercase()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    async fn retrieve(&self, query: &str) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fails {
            return Err(AppError::Internal("Mock retrieval backend down".to_string()));
        }
        let query = query.to_lowercase();
        if let Some(needle) = &self.panics_on
            && query.contains(needle)
        {
            panic!("retriever crashed on {:?}", query);
        }
        Ok(self
            .entries
            .iter()
            .find(|(keyword, _)| query.contains(keyword))
            .map(|(_, passage)| passage.clone()))
    }
}

/// Web search that records every query
#[derive(Clone, Default)]
pub struct CountingWebSearch {
    queries: Arc<Mutex<Vec<String>>>,
    misses: bool,
    fails: bool,
}

impl CountingWebSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every search returns nothing
    pub fn missing() -> Self {
        Self {
            misses: true,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fails: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for CountingWebSearch {
    async fn search(&self, query: &str) -> Result<Option<String>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fails {
            return Err(AppError::Internal("Mock search failure".to_string()));
        }
        if self.misses {
            return Ok(None);
        }
        Ok(Some(format!("Latest results for {}", query)))
    }
}

/// Graph wired to the given mocks
pub fn graph_with(
    llm: &MockLLMClient,
    retriever: &MockRetriever,
    web: &CountingWebSearch,
    max_parallel_questions: usize,
) -> Arc<ResearchGraph> {
    Arc::new(ResearchGraph::new(
        Collaborators::uniform(
            Arc::new(llm.clone()),
            Arc::new(retriever.clone()),
            Arc::new(web.clone()),
        ),
        max_parallel_questions,
    ))
}
