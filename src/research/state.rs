//! Per-request execution state and the sub-question merge reducer.
//!
//! Pipelines never share records. Each one works on a private copy of its own
//! [`SubQuestion`] and reports [`SubQuestionUpdate`]s; the orchestrator is the
//! only owner of the [`SubQuestionCollection`] and folds updates in with
//! [`SubQuestionCollection::merge`].

use crate::types::{ChatMessage, MessageRole};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a sub-question within one request (`q_0`, `q_1`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubQuestionId(String);

impl SubQuestionId {
    /// Identity for the sub-question at `index` in decomposition order
    pub fn new(index: usize) -> Self {
        Self(format!("q_{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubQuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One decomposed unit of the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubQuestion {
    pub id: SubQuestionId,
    pub question: String,
    pub needs_web_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl SubQuestion {
    pub fn new(id: SubQuestionId, question: impl Into<String>, needs_web_data: bool) -> Self {
        Self {
            id,
            question: question.into(),
            needs_web_data,
            retrieval_result: None,
            web_result: None,
            answer: None,
        }
    }

    /// Overwrite the fields present in `update`; absent fields are untouched
    fn apply(&mut self, update: SubQuestionUpdate) {
        if let Some(question) = update.question {
            self.question = question;
        }
        if let Some(needs_web_data) = update.needs_web_data {
            self.needs_web_data = needs_web_data;
        }
        if let Some(retrieval_result) = update.retrieval_result {
            self.retrieval_result = Some(retrieval_result);
        }
        if let Some(web_result) = update.web_result {
            self.web_result = Some(web_result);
        }
        if let Some(answer) = update.answer {
            self.answer = Some(answer);
        }
    }
}

/// Partial update to one sub-question, keyed by identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuestionUpdate {
    pub id: SubQuestionId,
    pub question: Option<String>,
    pub needs_web_data: Option<bool>,
    pub retrieval_result: Option<String>,
    pub web_result: Option<String>,
    pub answer: Option<String>,
}

impl SubQuestionUpdate {
    /// An update that changes nothing
    pub fn empty(id: SubQuestionId) -> Self {
        Self {
            id,
            question: None,
            needs_web_data: None,
            retrieval_result: None,
            web_result: None,
            answer: None,
        }
    }

    pub fn retrieval(id: SubQuestionId, result: Option<String>) -> Self {
        Self {
            retrieval_result: result,
            ..Self::empty(id)
        }
    }

    pub fn web(id: SubQuestionId, result: Option<String>) -> Self {
        Self {
            web_result: result,
            ..Self::empty(id)
        }
    }

    pub fn answer(id: SubQuestionId, answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            ..Self::empty(id)
        }
    }
}

impl From<SubQuestion> for SubQuestionUpdate {
    fn from(q: SubQuestion) -> Self {
        Self {
            id: q.id,
            question: Some(q.question),
            needs_web_data: Some(q.needs_web_data),
            retrieval_result: q.retrieval_result,
            web_result: q.web_result,
            answer: q.answer,
        }
    }
}

/// Ordered sub-question records, at most one per identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubQuestionCollection {
    items: Vec<SubQuestion>,
}

impl SubQuestionCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a partial update into the collection.
    ///
    /// Unknown identities are appended in first-seen order; known ones are
    /// updated in place, field by field.
    pub fn merge(&mut self, update: SubQuestionUpdate) {
        match self.items.iter_mut().find(|q| q.id == update.id) {
            Some(existing) => existing.apply(update),
            None => {
                let mut record = SubQuestion::new(update.id.clone(), String::new(), false);
                record.apply(update);
                self.items.push(record);
            }
        }
    }

    pub fn get(&self, id: &SubQuestionId) -> Option<&SubQuestion> {
        self.items.iter().find(|q| &q.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubQuestion> {
        self.items.iter()
    }

    /// Records that have an answer, in collection order
    pub fn answered(&self) -> impl Iterator<Item = &SubQuestion> {
        self.items.iter().filter(|q| q.answer.is_some())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<SubQuestionUpdate> for SubQuestionCollection {
    fn from_iter<I: IntoIterator<Item = SubQuestionUpdate>>(iter: I) -> Self {
        let mut collection = Self::new();
        for update in iter {
            collection.merge(update);
        }
        collection
    }
}

/// State of one in-flight request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub messages: Vec<ChatMessage>,
    pub sub_questions: SubQuestionCollection,
}

impl ExecutionState {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            sub_questions: SubQuestionCollection::new(),
        }
    }

    fn active_query_index(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|m| m.role == MessageRole::User)
    }

    /// Text of the last user-authored message
    pub fn active_query(&self) -> Option<&str> {
        self.active_query_index()
            .map(|i| self.messages[i].content.as_str())
    }

    /// Conversation without the active query, in chronological order
    pub fn history(&self) -> Vec<ChatMessage> {
        let active = self.active_query_index();
        self.messages
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != active)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Private working copies handed to pipeline instances, one per record
    pub fn branches(&self) -> Vec<SubQuestion> {
        self.sub_questions.iter().cloned().collect()
    }

    pub fn merge(&mut self, update: SubQuestionUpdate) {
        self.sub_questions.merge(update);
    }

    /// Reply appended by the synthesizer, if the request got that far
    pub fn final_answer(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == MessageRole::Assistant)
            .map(|m| m.content.as_str())
    }
}
