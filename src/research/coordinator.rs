use super::decomposer::Decomposer;
use super::pipeline::{PipelineEvent, PipelineReporter, QuestionPipeline, fallback_answer};
use super::stage::Stage;
use super::state::{ExecutionState, SubQuestion, SubQuestionId, SubQuestionUpdate};
use super::synthesizer::Synthesizer;
use crate::{
    llm::{LLMClient, ProviderRegistry},
    rag::{KnowledgeBase, NoRetrieval, Retriever},
    stream::{EventSink, Frame, into_frames},
    tools::{DaedraSearch, NoWebSearch, WebSearch},
    types::{AppError, ChatMessage, Result},
    utils::toml_config::AppConfig,
};
use futures::Stream;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

const EVENT_BUFFER: usize = 64;
const PIPELINE_BUFFER: usize = 64;

/// Everything the graph calls out to
#[derive(Clone)]
pub struct Collaborators {
    pub decomposer_llm: Arc<dyn LLMClient>,
    pub answer_llm: Arc<dyn LLMClient>,
    pub synthesizer_llm: Arc<dyn LLMClient>,
    pub retriever: Arc<dyn Retriever>,
    pub web_search: Arc<dyn WebSearch>,
}

impl Collaborators {
    /// Use one completion client for every model role
    pub fn uniform(
        llm: Arc<dyn LLMClient>,
        retriever: Arc<dyn Retriever>,
        web_search: Arc<dyn WebSearch>,
    ) -> Self {
        Self {
            decomposer_llm: Arc::clone(&llm),
            answer_llm: Arc::clone(&llm),
            synthesizer_llm: llm,
            retriever,
            web_search,
        }
    }

    /// Build clients and backends from the `[research]` section
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = ProviderRegistry::from_config(config);
        let research = &config.research;

        let decomposer_llm = registry
            .create_client_for_model(&research.decomposer_model)
            .await?;
        let answer_llm = registry
            .create_client_for_model(&research.answer_model)
            .await?;
        let synthesizer_llm = registry
            .create_client_for_model(&research.synthesizer_model)
            .await?;

        let retriever: Arc<dyn Retriever> = if research.retrieval.enabled {
            Arc::new(KnowledgeBase::from_config(&research.retrieval)?)
        } else {
            tracing::info!("Retrieval disabled");
            Arc::new(NoRetrieval)
        };

        let web_search: Arc<dyn WebSearch> = if research.web_search.enabled {
            Arc::new(DaedraSearch::new(research.web_search.num_results))
        } else {
            tracing::info!("Web search disabled");
            Arc::new(NoWebSearch)
        };

        Ok(Self {
            decomposer_llm,
            answer_llm,
            synthesizer_llm,
            retriever,
            web_search,
        })
    }
}

/// The compiled research topology: decompose, fan out one pipeline per
/// sub-question, fan in, synthesize.
///
/// Built once and shared behind an `Arc`. It holds no request data, so any
/// number of requests can run through it at the same time.
pub struct ResearchGraph {
    decomposer: Decomposer,
    pipeline: Arc<QuestionPipeline>,
    synthesizer: Synthesizer,
    max_parallel_questions: usize,
}

impl ResearchGraph {
    /// `max_parallel_questions == 0` lets every pipeline run at once
    pub fn new(collaborators: Collaborators, max_parallel_questions: usize) -> Self {
        Self {
            decomposer: Decomposer::new(collaborators.decomposer_llm),
            pipeline: Arc::new(QuestionPipeline::new(
                collaborators.answer_llm,
                collaborators.retriever,
                collaborators.web_search,
            )),
            synthesizer: Synthesizer::new(collaborators.synthesizer_llm),
            max_parallel_questions,
        }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let collaborators = Collaborators::from_config(config).await?;
        Ok(Self::new(collaborators, config.research.max_parallel_questions))
    }

    /// Run one request to completion, writing progress and tokens to `sink`.
    ///
    /// Returns the final state with the synthesized reply appended as an
    /// assistant message. Does not write a terminal event; that is the
    /// caller's job.
    pub async fn invoke(
        &self,
        messages: Vec<ChatMessage>,
        sink: &EventSink,
    ) -> Result<ExecutionState> {
        let mut state = ExecutionState::new(messages);
        let query = state
            .active_query()
            .ok_or_else(|| AppError::InvalidInput("No user message in request".to_string()))?
            .to_string();

        let seeds = self.decomposer.decompose(&query).await?;
        sink.step(Stage::Decomposer).await?;

        for (index, seed) in seeds.into_iter().enumerate() {
            let question = SubQuestion::new(
                SubQuestionId::new(index),
                seed.question,
                seed.needs_web_data,
            );
            state.merge(question.into());
        }

        self.fan_out(&mut state, sink).await?;

        let reply = self.synthesizer.synthesize(&state, sink).await?;
        state.messages.push(ChatMessage::assistant(reply));
        Ok(state)
    }

    /// Run one pipeline per sub-question and merge their updates into `state`.
    ///
    /// This task is the only writer of `state`; pipelines report over a
    /// channel. Returns once every pipeline has terminated.
    async fn fan_out(&self, state: &mut ExecutionState, sink: &EventSink) -> Result<()> {
        let branches = state.branches();
        tracing::info!(
            sub_questions = branches.len(),
            max_parallel = self.max_parallel_questions,
            "Fanning out question pipelines"
        );

        let (tx, mut rx) = mpsc::channel(PIPELINE_BUFFER);
        let limiter = (self.max_parallel_questions > 0)
            .then(|| Arc::new(Semaphore::new(self.max_parallel_questions)));

        // Dropping the set on early return aborts every pipeline still running
        let mut tasks = JoinSet::new();
        for question in branches {
            let pipeline = Arc::clone(&self.pipeline);
            let reporter = PipelineReporter::new(tx.clone());
            let limiter = limiter.clone();
            let span = tracing::info_span!("question_pipeline", id = %question.id);

            tasks.spawn(
                async move {
                    let _permit = match limiter {
                        Some(limiter) => limiter.acquire_owned().await.ok(),
                        None => None,
                    };
                    pipeline.run(question, &reporter).await
                }
                .instrument(span),
            );
        }
        drop(tx);

        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::Stage(stage) => sink.step(stage).await?,
                PipelineEvent::Update(update) => state.merge(update),
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(question) => state.merge(question.into()),
                Err(e) => tracing::error!(error = %e, "Question pipeline task failed"),
            }
        }

        let unanswered: Vec<(SubQuestionId, String)> = state
            .sub_questions
            .iter()
            .filter(|q| q.answer.is_none())
            .map(|q| (q.id.clone(), q.question.clone()))
            .collect();
        for (id, question) in unanswered {
            tracing::warn!(id = %id, "Pipeline ended without an answer, using fallback");
            state.merge(SubQuestionUpdate::answer(id, fallback_answer(&question)));
        }

        tracing::info!(answers = state.sub_questions.answered().count(), "Fan-in complete");
        Ok(())
    }

    /// Run a request in the background and return its frame stream.
    ///
    /// The stream always ends with exactly one `d:` or `3:` frame. Dropping
    /// it aborts the request along with its in-flight pipelines.
    pub fn stream(self: Arc<Self>, messages: Vec<ChatMessage>) -> impl Stream<Item = Frame> + Send {
        let (sink, rx) = EventSink::channel(EVENT_BUFFER);
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("research_request", request_id = %request_id);

        tokio::spawn(
            async move {
                tokio::select! {
                    result = self.invoke(messages, &sink) => {
                        let delivered = match result {
                            Ok(_) => sink.finish().await,
                            Err(e) => {
                                tracing::error!(error = %e, "Research request failed");
                                sink.fail(e.to_string()).await
                            }
                        };
                        if delivered.is_err() {
                            tracing::debug!("Caller went away before the terminal frame");
                        }
                    }
                    _ = sink.closed() => {
                        tracing::warn!("Caller disconnected, aborting research request");
                    }
                }
            }
            .instrument(span),
        );

        into_frames(rx)
    }
}
