use super::stage::Stage;
use super::state::{SubQuestion, SubQuestionUpdate};
use crate::llm::LLMClient;
use crate::rag::Retriever;
use crate::tools::WebSearch;
use std::sync::Arc;
use tokio::sync::mpsc;

const ANSWER_WITH_CONTEXT_PROMPT: &str = "You are a helpful assistant. Answer the specific question concisely and directly using the provided context. If the context is thin or irrelevant, still give a useful answer from your general knowledge.";

const ANSWER_GENERAL_PROMPT: &str = "You are a helpful assistant. Answer the specific question concisely and directly from your general knowledge.";

/// Message from a pipeline instance to the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Stage(Stage),
    Update(SubQuestionUpdate),
}

/// Send half handed to each pipeline instance
#[derive(Debug, Clone)]
pub struct PipelineReporter {
    tx: mpsc::Sender<PipelineEvent>,
}

impl PipelineReporter {
    pub fn new(tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self { tx }
    }

    // A closed channel means the request was aborted and this task is about
    // to be cancelled, so send failures are ignored.
    async fn stage(&self, stage: Stage) {
        let _ = self.tx.send(PipelineEvent::Stage(stage)).await;
    }

    async fn update(&self, update: SubQuestionUpdate) {
        let _ = self.tx.send(PipelineEvent::Update(update)).await;
    }
}

/// Deterministic answer recorded when the answer stage fails
pub fn fallback_answer(question: &str) -> String {
    format!(
        "Unable to generate an answer for: \"{}\". Please try again.",
        question
    )
}

/// Context block for the answer stage: knowledge base first, then web results
pub fn build_context(question: &SubQuestion) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(kb) = &question.retrieval_result {
        parts.push(format!("Knowledge base context:\n{}", kb));
    }
    if let Some(web) = &question.web_result {
        parts.push(format!("Web search results:\n{}", web));
    }
    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

/// retrieval -> web search (only when flagged) -> answer, for one sub-question.
///
/// Instances share nothing but the collaborators; every instance works on its
/// own [`SubQuestion`] and reports progress through a [`PipelineReporter`].
pub struct QuestionPipeline {
    llm: Arc<dyn LLMClient>,
    retriever: Arc<dyn Retriever>,
    web_search: Arc<dyn WebSearch>,
}

impl QuestionPipeline {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        retriever: Arc<dyn Retriever>,
        web_search: Arc<dyn WebSearch>,
    ) -> Self {
        Self {
            llm,
            retriever,
            web_search,
        }
    }

    /// Run all stages and return the final state of `question`.
    ///
    /// Never fails: collaborator errors become misses and a failed answer
    /// becomes [`fallback_answer`]. The `question_pipeline` step is reported
    /// once the instance has its answer.
    pub async fn run(&self, mut question: SubQuestion, reporter: &PipelineReporter) -> SubQuestion {
        let id = question.id.clone();

        question.retrieval_result = self.retrieve(&question).await;
        reporter
            .update(SubQuestionUpdate::retrieval(
                id.clone(),
                question.retrieval_result.clone(),
            ))
            .await;
        reporter.stage(Stage::Retrieval).await;

        if question.needs_web_data {
            question.web_result = self.search_web(&question).await;
            reporter
                .update(SubQuestionUpdate::web(id.clone(), question.web_result.clone()))
                .await;
            reporter.stage(Stage::WebSearch).await;
        }

        let answer = self.answer(&question).await;
        question.answer = Some(answer.clone());
        reporter.update(SubQuestionUpdate::answer(id, answer)).await;
        reporter.stage(Stage::AnswerGenerator).await;
        reporter.stage(Stage::QuestionPipeline).await;

        question
    }

    async fn retrieve(&self, question: &SubQuestion) -> Option<String> {
        match self.retriever.retrieve(&question.question).await {
            Ok(result) => {
                tracing::debug!(id = %question.id, hit = result.is_some(), "Retrieval finished");
                result
            }
            Err(e) => {
                tracing::warn!(id = %question.id, error = %e, "Retrieval failed, continuing without context");
                None
            }
        }
    }

    async fn search_web(&self, question: &SubQuestion) -> Option<String> {
        tracing::debug!(id = %question.id, query = %question.question, "Searching the web");
        match self.web_search.search(&question.question).await {
            Ok(result) => {
                tracing::debug!(id = %question.id, hit = result.is_some(), "Web search finished");
                result
            }
            Err(e) => {
                tracing::warn!(id = %question.id, error = %e, "Web search failed, continuing without results");
                None
            }
        }
    }

    /// Answer one sub-question from whatever context it has collected
    pub async fn answer(&self, question: &SubQuestion) -> String {
        let context = build_context(question);
        let source = match (&question.retrieval_result, &question.web_result) {
            (Some(_), Some(_)) => "knowledge base + web",
            (Some(_), None) => "knowledge base",
            (None, Some(_)) => "web",
            (None, None) => "general knowledge",
        };
        tracing::info!(id = %question.id, source, "Generating answer");

        let (system, prompt) = match context {
            Some(context) => (
                ANSWER_WITH_CONTEXT_PROMPT,
                format!("Context:\n{}\n\nQuestion: {}", context, question.question),
            ),
            None => (ANSWER_GENERAL_PROMPT, question.question.clone()),
        };

        match self.llm.generate_with_system(system, &prompt).await {
            Ok(answer) => {
                if answer.trim().is_empty() {
                    tracing::warn!(id = %question.id, "Model returned an empty answer");
                }
                answer
            }
            Err(e) => {
                tracing::warn!(id = %question.id, error = %e, "Answer generation failed, using fallback");
                fallback_answer(&question.question)
            }
        }
    }
}
