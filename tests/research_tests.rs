//! End-to-end tests for the research graph using mock collaborators.

mod common;

use ares_research::research::{SubQuestionId, fallback_answer};
use ares_research::stream::{EventSink, FinishPayload, Frame, StreamEvent};
use ares_research::types::{AppError, ChatMessage, MessageRole};
use common::mocks::{CountingWebSearch, MockLLMClient, MockRetriever, graph_with};
use common::{collect_frames, step_nodes, text_of};
use futures::StreamExt;
use rstest::rstest;
use std::collections::HashSet;
use std::time::Duration;

const TRENDS: &str = "What's new in X trends?";
const ARITHMETIC: &str = "What is 2+2?";

fn scenario_a_llm() -> MockLLMClient {
    MockLLMClient::new(&[(TRENDS, true), (ARITHMETIC, false)])
}

fn request() -> Vec<ChatMessage> {
    vec![ChatMessage::user("What's new in X trends, and what is 2+2?")]
}

/// Drain everything currently buffered in `rx`
fn drain(rx: &mut tokio::sync::mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ============= Scenarios =============

#[tokio::test]
async fn test_two_part_question_is_researched_and_merged() {
    let llm = scenario_a_llm();
    let retriever = MockRetriever::empty();
    let web = CountingWebSearch::new();
    let graph = graph_with(&llm, &retriever, &web, 8);

    let (sink, mut rx) = EventSink::channel(256);
    let state = graph.invoke(request(), &sink).await.unwrap();

    let ids: Vec<&str> = state.sub_questions.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(ids, vec!["q_0", "q_1"]);

    let trends = state.sub_questions.get(&SubQuestionId::new(0)).unwrap();
    assert!(trends.needs_web_data);
    assert_eq!(
        trends.web_result.as_deref(),
        Some("Latest results for What's new in X trends?")
    );
    assert!(trends.answer.as_deref().unwrap().contains(TRENDS));

    let arithmetic = state.sub_questions.get(&SubQuestionId::new(1)).unwrap();
    assert!(!arithmetic.needs_web_data);
    assert!(arithmetic.web_result.is_none());
    assert_eq!(
        arithmetic.answer.as_deref(),
        Some("Answer to What is 2+2?")
    );

    assert_eq!(web.calls(), 1);
    assert_eq!(web.queries(), vec![TRENDS.to_string()]);
    assert_eq!(llm.answer_calls().len(), 2);

    // One synthesized assistant message appended to the conversation
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.final_answer(), Some("Hello world"));

    // The synthesizer saw both answers
    let synthesis = llm.synthesis_calls();
    assert_eq!(synthesis.len(), 1);
    let final_turn = &synthesis[0].last().unwrap().content;
    assert!(final_turn.contains(&format!("Q: {}", TRENDS)));
    assert!(final_turn.contains(&format!("Q: {}", ARITHMETIC)));

    let events = drain(&mut rx);
    assert_eq!(events.first(), Some(&StreamEvent::Step(ares_research::research::Stage::Decomposer)));
    assert!(!events.contains(&StreamEvent::Finish));
}

#[tokio::test]
async fn test_no_context_uses_general_knowledge() {
    let llm = MockLLMClient::new(&[("Who painted the Mona Lisa?", true)]);
    let retriever = MockRetriever::empty();
    let web = CountingWebSearch::missing();
    let graph = graph_with(&llm, &retriever, &web, 8);

    let frames = collect_frames(graph, vec![ChatMessage::user("Who painted the Mona Lisa?")]).await;
    assert_eq!(frames.last(), Some(&Frame::Finish(FinishPayload::stop())));

    let calls = llm.answer_calls();
    assert_eq!(calls.len(), 1);
    // No context block: the prompt is the bare question
    assert_eq!(calls[0].prompt, "Who painted the Mona Lisa?");
    assert!(!calls[0].system.contains("provided context"));
    assert_eq!(web.calls(), 1);
}

#[tokio::test]
async fn test_context_is_sent_when_present() {
    let llm = MockLLMClient::new(&[("How long do eyelash extensions take?", false)]);
    let retriever = MockRetriever::empty().with_entry("eyelash", "The procedure takes 1.5-3 hours.");
    let web = CountingWebSearch::new();
    let graph = graph_with(&llm, &retriever, &web, 8);

    let frames = collect_frames(graph, request()).await;
    assert!(matches!(frames.last(), Some(Frame::Finish(_))));

    let calls = llm.answer_calls();
    assert!(calls[0].system.contains("provided context"));
    assert!(calls[0].prompt.starts_with("Context:\nKnowledge base context:\nThe procedure takes 1.5-3 hours."));
    assert!(calls[0].prompt.ends_with("Question: How long do eyelash extensions take?"));
}

#[tokio::test]
async fn test_decomposition_failure_emits_single_error() {
    let llm = scenario_a_llm().failing_decomposition();
    let retriever = MockRetriever::empty();
    let web = CountingWebSearch::new();
    let graph = graph_with(&llm, &retriever, &web, 8);

    let frames = collect_frames(graph, request()).await;

    assert_eq!(frames.len(), 1);
    match &frames[0] {
        Frame::Error(message) => assert!(message.starts_with("Decomposition failed")),
        other => panic!("expected error frame, got {:?}", other),
    }
    assert!(llm.answer_calls().is_empty());
    assert_eq!(retriever.calls(), 0);
}

#[rstest]
#[case::empty_list(r#"{"questions": []}"#)]
#[case::blank_question(r#"{"questions": [{"question": " ", "needsWebData": false}]}"#)]
#[case::wrong_shape(r#"{"items": ["a"]}"#)]
#[case::not_json("I could not split that, sorry.")]
#[tokio::test]
async fn test_invalid_decomposition_is_fatal(#[case] reply: &str) {
    let llm = scenario_a_llm().with_raw_decomposition(reply);
    let graph = graph_with(&llm, &MockRetriever::empty(), &CountingWebSearch::new(), 8);

    let frames = collect_frames(graph, request()).await;

    assert_eq!(frames.len(), 1);
    assert!(matches!(frames[0], Frame::Error(_)));
}

#[tokio::test]
async fn test_fenced_decomposition_is_accepted() {
    let reply = format!(
        "Here you go:\n```json\n{}\n```",
        common::mocks::decomposition(&[(ARITHMETIC, false)])
    );
    let llm = MockLLMClient::new(&[]).with_raw_decomposition(&reply);
    let graph = graph_with(&llm, &MockRetriever::empty(), &CountingWebSearch::new(), 8);

    let frames = collect_frames(graph, request()).await;
    assert!(matches!(frames.last(), Some(Frame::Finish(_))));
    assert_eq!(llm.answer_calls().len(), 1);
}

// ============= Failure containment =============

#[tokio::test]
async fn test_failed_answer_gets_fallback_and_siblings_complete() {
    let llm = scenario_a_llm().failing_answer_for("2+2");
    let retriever = MockRetriever::empty();
    let web = CountingWebSearch::new();
    let graph = graph_with(&llm, &retriever, &web, 8);

    let (sink, _rx) = EventSink::channel(256);
    let state = graph.invoke(request(), &sink).await.unwrap();

    let failed = state.sub_questions.get(&SubQuestionId::new(1)).unwrap();
    assert_eq!(failed.answer.as_deref(), Some(fallback_answer(ARITHMETIC).as_str()));
    assert_eq!(
        fallback_answer(ARITHMETIC),
        "Unable to generate an answer for: \"What is 2+2?\". Please try again."
    );

    let sibling = state.sub_questions.get(&SubQuestionId::new(0)).unwrap();
    assert!(sibling.answer.as_deref().unwrap().starts_with("Answer to"));
    assert!(state.final_answer().is_some());
}

#[tokio::test]
async fn test_all_answers_failing_still_finishes() {
    let llm = scenario_a_llm().failing_answers();
    let graph = graph_with(&llm, &MockRetriever::empty(), &CountingWebSearch::new(), 8);

    let frames = collect_frames(graph, request()).await;
    assert!(matches!(frames.last(), Some(Frame::Finish(_))));

    let final_turn = llm.synthesis_calls()[0].last().unwrap().content.clone();
    assert!(final_turn.contains("Unable to generate an answer for: \"What's new in X trends?\""));
    assert!(final_turn.contains("Unable to generate an answer for: \"What is 2+2?\""));
}

#[tokio::test]
async fn test_collaborator_errors_are_misses() {
    let llm = scenario_a_llm();
    let retriever = MockRetriever::failing();
    let web = CountingWebSearch::failing();
    let graph = graph_with(&llm, &retriever, &web, 8);

    let (sink, _rx) = EventSink::channel(256);
    let state = graph.invoke(request(), &sink).await.unwrap();

    assert_eq!(retriever.calls(), 2);
    assert_eq!(web.calls(), 1);
    for q in state.sub_questions.iter() {
        assert!(q.retrieval_result.is_none());
        assert!(q.web_result.is_none());
        assert!(q.answer.as_deref().unwrap().starts_with("Answer to"));
    }
}

#[tokio::test]
async fn test_panicked_pipeline_gets_fallback() {
    let llm = MockLLMClient::new(&[("Boom question?", false), (ARITHMETIC, false)]);
    let retriever = MockRetriever::panicking_on("boom");
    let graph = graph_with(&llm, &retriever, &CountingWebSearch::new(), 8);

    let (sink, _rx) = EventSink::channel(256);
    let state = graph.invoke(request(), &sink).await.unwrap();

    let crashed = state.sub_questions.get(&SubQuestionId::new(0)).unwrap();
    assert_eq!(
        crashed.answer.as_deref(),
        Some("Unable to generate an answer for: \"Boom question?\". Please try again.")
    );
    let sibling = state.sub_questions.get(&SubQuestionId::new(1)).unwrap();
    assert_eq!(sibling.answer.as_deref(), Some("Answer to What is 2+2?"));
    assert_eq!(state.final_answer(), Some("Hello world"));

    let frames = collect_frames(graph, request()).await;
    assert_eq!(frames.last(), Some(&Frame::Finish(FinishPayload::stop())));
    assert_eq!(frames.iter().filter(|f| f.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_blank_answer_is_recorded_as_returned() {
    let llm = MockLLMClient::new(&[(ARITHMETIC, false)]).with_blank_answers();
    let graph = graph_with(&llm, &MockRetriever::empty(), &CountingWebSearch::new(), 8);

    let (sink, _rx) = EventSink::channel(256);
    let state = graph.invoke(request(), &sink).await.unwrap();

    let record = state.sub_questions.get(&SubQuestionId::new(0)).unwrap();
    assert_eq!(record.answer.as_deref(), Some("  "));
}

#[tokio::test]
async fn test_synthesis_failure_emits_error_without_finish() {
    let llm = scenario_a_llm().failing_synthesis();
    let graph = graph_with(&llm, &MockRetriever::empty(), &CountingWebSearch::new(), 8);

    let frames = collect_frames(graph.clone(), request()).await;

    assert!(!frames.iter().any(|f| matches!(f, Frame::Finish(_))));
    assert!(!frames.iter().any(|f| matches!(f, Frame::Text(_))));
    match frames.last() {
        Some(Frame::Error(message)) => assert!(message.starts_with("Synthesis failed")),
        other => panic!("expected error frame, got {:?}", other),
    }

    let (sink, _rx) = EventSink::channel(256);
    let err = graph.invoke(request(), &sink).await.unwrap_err();
    assert!(matches!(err, AppError::Synthesis(_)));
}

#[tokio::test]
async fn test_synthesis_failure_mid_stream() {
    let llm = scenario_a_llm()
        .with_synthesis_tokens(&["Partial", " answer"])
        .failing_synthesis_mid_stream();
    let graph = graph_with(&llm, &MockRetriever::empty(), &CountingWebSearch::new(), 8);

    let frames = collect_frames(graph, request()).await;

    assert_eq!(text_of(&frames), "Partial answer");
    assert!(matches!(frames.last(), Some(Frame::Error(_))));
    assert_eq!(frames.iter().filter(|f| f.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_request_without_user_message_is_rejected() {
    let llm = scenario_a_llm();
    let graph = graph_with(&llm, &MockRetriever::empty(), &CountingWebSearch::new(), 8);

    let (sink, _rx) = EventSink::channel(16);
    let err = graph
        .invoke(vec![ChatMessage::assistant("hello")], &sink)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

// ============= Fan-out =============

#[rstest]
#[case(1)]
#[case(3)]
#[case(12)]
#[tokio::test]
async fn test_web_search_only_runs_when_requested(#[case] count: usize) {
    let questions: Vec<String> = (0..count).map(|i| format!("Static fact number {}?", i)).collect();
    let seeds: Vec<(&str, bool)> = questions.iter().map(|q| (q.as_str(), false)).collect();
    let llm = MockLLMClient::new(&seeds);
    let retriever = MockRetriever::empty();
    let web = CountingWebSearch::new();
    let graph = graph_with(&llm, &retriever, &web, 4);

    let frames = collect_frames(graph, request()).await;

    assert!(matches!(frames.last(), Some(Frame::Finish(_))));
    assert_eq!(web.calls(), 0);
    assert_eq!(retriever.calls(), count);
    assert_eq!(llm.answer_calls().len(), count);
    assert!(!step_nodes(&frames).contains(&"web_search".to_string()));
}

#[tokio::test]
async fn test_each_pipeline_only_sees_its_own_question() {
    let questions = ["Alpha question?", "Beta question?", "Gamma question?"];
    let seeds: Vec<(&str, bool)> = questions.iter().map(|q| (*q, true)).collect();
    let llm = MockLLMClient::new(&seeds);
    let web = CountingWebSearch::new();
    let graph = graph_with(&llm, &MockRetriever::empty(), &web, 8);

    let (sink, _rx) = EventSink::channel(256);
    let state = graph.invoke(request(), &sink).await.unwrap();

    for call in llm.answer_calls() {
        let mentioned = questions.iter().filter(|q| call.prompt.contains(*q)).count();
        assert_eq!(mentioned, 1, "prompt leaked another branch: {}", call.prompt);
    }

    for (i, question) in questions.iter().enumerate() {
        let record = state.sub_questions.get(&SubQuestionId::new(i)).unwrap();
        assert_eq!(record.question, *question);
        assert_eq!(
            record.web_result.as_deref(),
            Some(format!("Latest results for {}", question).as_str())
        );
        assert_eq!(
            record.answer.as_deref(),
            Some(format!("Answer to {}", question).as_str())
        );
    }

    let queried: HashSet<String> = web.queries().into_iter().collect();
    assert_eq!(queried.len(), 3);
}

#[tokio::test]
async fn test_fan_out_respects_parallel_bound() {
    let questions: Vec<String> = (0..6).map(|i| format!("Question {}?", i)).collect();
    let seeds: Vec<(&str, bool)> = questions.iter().map(|q| (q.as_str(), false)).collect();
    let llm = MockLLMClient::new(&seeds).with_answer_delay(Duration::from_millis(40));
    let graph = graph_with(&llm, &MockRetriever::empty(), &CountingWebSearch::new(), 2);

    let frames = collect_frames(graph, request()).await;

    assert!(matches!(frames.last(), Some(Frame::Finish(_))));
    assert!(llm.max_in_flight() <= 2);
    assert_eq!(llm.answers_completed(), 6);
}

#[tokio::test]
async fn test_unbounded_fan_out_runs_concurrently() {
    let questions: Vec<String> = (0..6).map(|i| format!("Question {}?", i)).collect();
    let seeds: Vec<(&str, bool)> = questions.iter().map(|q| (q.as_str(), false)).collect();
    let llm = MockLLMClient::new(&seeds).with_answer_delay(Duration::from_millis(100));
    let graph = graph_with(&llm, &MockRetriever::empty(), &CountingWebSearch::new(), 0);

    let frames = collect_frames(graph, request()).await;

    assert!(matches!(frames.last(), Some(Frame::Finish(_))));
    assert!(llm.max_in_flight() > 1);
}

#[tokio::test]
async fn test_dropping_stream_aborts_pipelines() {
    let llm = scenario_a_llm().with_answer_delay(Duration::from_secs(5));
    let graph = graph_with(&llm, &MockRetriever::empty(), &CountingWebSearch::new(), 8);

    let mut frames = Box::pin(graph.stream(request()));
    let first = frames.next().await;
    assert_eq!(
        first,
        Some(Frame::Annotation(vec![ares_research::research::Stage::Decomposer.into()]))
    );
    drop(frames);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(llm.answers_completed(), 0);
    assert!(llm.synthesis_calls().is_empty());
}

#[tokio::test]
async fn test_graph_serves_concurrent_requests() {
    let llm = scenario_a_llm();
    let web = CountingWebSearch::new();
    let graph = graph_with(&llm, &MockRetriever::empty(), &web, 8);

    let (a, b) = tokio::join!(
        collect_frames(graph.clone(), request()),
        collect_frames(graph.clone(), request())
    );

    for frames in [a, b] {
        assert!(matches!(frames.last(), Some(Frame::Finish(_))));
        assert_eq!(text_of(&frames), "Hello world");
    }
    assert_eq!(web.calls(), 2);
    assert_eq!(llm.answer_calls().len(), 4);
}

// ============= Stream framing =============

#[tokio::test]
async fn test_frames_are_deduplicated_and_ordered() {
    let questions: Vec<String> = (0..5).map(|i| format!("Topic {} news?", i)).collect();
    let seeds: Vec<(&str, bool)> = questions.iter().map(|q| (q.as_str(), true)).collect();
    let llm = MockLLMClient::new(&seeds).with_synthesis_tokens(&["One", " reply", "."]);
    let graph = graph_with(&llm, &MockRetriever::empty(), &CountingWebSearch::new(), 8);

    let frames = collect_frames(graph, request()).await;

    let nodes = step_nodes(&frames);
    let unique: HashSet<&String> = nodes.iter().collect();
    assert_eq!(unique.len(), nodes.len(), "duplicate step: {:?}", nodes);
    assert_eq!(nodes.first().map(String::as_str), Some("decomposer"));
    assert_eq!(nodes.last().map(String::as_str), Some("synthesizer"));
    for node in ["question_pipeline", "retrieval", "web_search", "answer_generator"] {
        assert!(nodes.contains(&node.to_string()), "missing {}", node);
    }

    // Every token comes after the synthesizer step
    let synth_pos = frames
        .iter()
        .position(|f| matches!(f, Frame::Annotation(s) if s[0].node == "synthesizer"))
        .unwrap();
    let first_text = frames.iter().position(|f| matches!(f, Frame::Text(_))).unwrap();
    assert!(first_text > synth_pos);
    assert_eq!(text_of(&frames), "One reply.");

    // Exactly one terminal frame and it is last
    assert_eq!(frames.iter().filter(|f| f.is_terminal()).count(), 1);
    assert_eq!(frames.last(), Some(&Frame::Finish(FinishPayload::stop())));
}

#[tokio::test]
async fn test_pipeline_step_follows_its_stages() {
    let llm = MockLLMClient::new(&[(TRENDS, true)]);
    let graph = graph_with(&llm, &MockRetriever::empty(), &CountingWebSearch::new(), 8);

    let frames = collect_frames(graph, request()).await;

    assert_eq!(
        step_nodes(&frames),
        vec![
            "decomposer",
            "retrieval",
            "web_search",
            "answer_generator",
            "question_pipeline",
            "synthesizer",
        ]
    );
}

#[tokio::test]
async fn test_history_is_replayed_to_synthesizer() {
    let llm = scenario_a_llm();
    let graph = graph_with(&llm, &MockRetriever::empty(), &CountingWebSearch::new(), 8);

    let messages = vec![
        ChatMessage::user("Привет"),
        ChatMessage::assistant("Здравствуйте! Чем помочь?"),
        ChatMessage::user("What's new in X trends, and what is 2+2?"),
    ];
    let frames = collect_frames(graph, messages).await;
    assert!(matches!(frames.last(), Some(Frame::Finish(_))));

    let synthesis = &llm.synthesis_calls()[0];
    assert_eq!(synthesis[0].role, MessageRole::System);
    assert_eq!(synthesis[1], ChatMessage::user("Привет"));
    assert_eq!(synthesis[2], ChatMessage::assistant("Здравствуйте! Чем помочь?"));
    assert_eq!(synthesis.len(), 4);
    assert!(!synthesis[3].content.contains("and what is 2+2?"));
}
