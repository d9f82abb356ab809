//! Question records and their repository.
//!
//! The whole collection is one JSON array stored under [`QUESTIONS_KEY`]. Every
//! mutation loads the array, changes it in memory and writes it back; concurrent
//! writers race and the last write wins.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::store::{KvStore, StoreError};

pub const QUESTIONS_KEY: &str = "all_questions";
/// Shortest public submission accepted, in characters after trimming.
pub const MIN_QUESTION_CHARS: usize = 10;
pub const MAX_QUESTION_CHARS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default = "new_id", deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub question: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidQuestion {
    #[error("question text is required")]
    Missing,
    #[error("question must be at least {min} characters long")]
    TooShort { min: usize },
    #[error("question must be at most {max} characters long")]
    TooLong { max: usize },
}

/// Admin-supplied fields for creating or editing a question.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionInput {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// A [`QuestionInput`] that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionEdit {
    question: String,
    answer: String,
    source: Option<String>,
    tags: Option<Vec<String>>,
}

impl QuestionInput {
    pub fn validate(self) -> Result<QuestionEdit, InvalidQuestion> {
        let question = validate_text(&self.question, 1)?;
        let answer = self
            .answer
            .filter(|answer| !answer.trim().is_empty())
            .unwrap_or_default();
        let source = self
            .source
            .map(|source| source.trim().to_string())
            .filter(|source| !source.is_empty());
        Ok(QuestionEdit {
            question,
            answer,
            source,
            tags: self.tags.map(normalize_tags),
        })
    }
}

/// Validate public submission text, returning it trimmed.
pub fn validate_submission(text: &str) -> Result<String, InvalidQuestion> {
    validate_text(text, MIN_QUESTION_CHARS)
}

fn validate_text(text: &str, min_chars: usize) -> Result<String, InvalidQuestion> {
    let trimmed = text.trim();
    let chars = trimmed.chars().count();
    if chars == 0 {
        return Err(InvalidQuestion::Missing);
    }
    if chars < min_chars {
        return Err(InvalidQuestion::TooShort { min: min_chars });
    }
    if chars > MAX_QUESTION_CHARS {
        return Err(InvalidQuestion::TooLong {
            max: MAX_QUESTION_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

/// Trim tags, drop blanks and repeats, keep first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
        .collect()
}

impl Question {
    /// A visitor's submission: unanswered, untagged.
    pub fn submitted(text: String, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            question: text,
            answer: String::new(),
            source: None,
            tags: Vec::new(),
            date: now,
            answered_date: None,
            last_modified: None,
        }
    }

    pub fn create(edit: QuestionEdit, now: DateTime<Utc>) -> Self {
        let answered_date = (!edit.answer.is_empty()).then_some(now);
        Self {
            id: new_id(),
            question: edit.question,
            answer: edit.answer,
            source: edit.source,
            tags: edit.tags.unwrap_or_default(),
            date: now,
            answered_date,
            last_modified: None,
        }
    }

    /// `answered_date` is stamped the first time an answer appears and is
    /// never moved afterwards. Omitted tags are left as they were.
    pub fn apply_edit(&mut self, edit: QuestionEdit, now: DateTime<Utc>) {
        self.question = edit.question;
        self.answer = edit.answer;
        self.source = edit.source;
        if let Some(tags) = edit.tags {
            self.tags = tags;
        }
        self.last_modified = Some(now);
        if self.is_answered() && self.answered_date.is_none() {
            self.answered_date = Some(now);
        }
    }

    pub fn is_answered(&self) -> bool {
        !self.answer.trim().is_empty()
    }

    fn answered_at(&self) -> DateTime<Utc> {
        self.answered_date.unwrap_or(self.date)
    }
}

/// Answered questions, most recently answered first.
pub fn answered_newest_first(questions: Vec<Question>) -> Vec<Question> {
    let mut answered: Vec<Question> = questions.into_iter().filter(Question::is_answered).collect();
    answered.sort_by(|a, b| b.answered_at().cmp(&a.answered_at()));
    answered
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Older archives used millisecond timestamps as ids, or stored none at all.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to retrieve questions: {0}")]
    Retrieve(#[source] StoreError),
    #[error("failed to save questions: {0}")]
    Write(#[source] StoreError),
}

#[derive(Debug, Clone)]
pub struct QuestionRepository {
    store: KvStore,
}

impl QuestionRepository {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// An absent document is an empty archive; any other failure is surfaced.
    pub async fn load_all(&self) -> Result<Vec<Question>, RepositoryError> {
        match self.store.get_json::<Vec<Question>>(QUESTIONS_KEY).await {
            Ok(Some(questions)) => {
                debug!(count = questions.len(), "questions loaded");
                Ok(questions)
            }
            Ok(None) => Ok(Vec::new()),
            Err(err) => {
                error!(error = %err, "failed to read questions from store");
                Err(RepositoryError::Retrieve(err))
            }
        }
    }

    pub async fn save_all(&self, questions: &[Question]) -> Result<(), RepositoryError> {
        self.store
            .set_json(QUESTIONS_KEY, questions, None)
            .await
            .map_err(|err| {
                error!(error = %err, count = questions.len(), "failed to write questions to store");
                RepositoryError::Write(err)
            })
    }

    /// Insert at the front so the archive stays newest-first.
    pub async fn prepend(&self, question: Question) -> Result<(), RepositoryError> {
        let mut questions = self.load_all().await?;
        questions.insert(0, question);
        self.save_all(&questions).await
    }

    pub async fn update(
        &self,
        id: &str,
        edit: QuestionEdit,
        now: DateTime<Utc>,
    ) -> Result<Option<Question>, RepositoryError> {
        let mut questions = self.load_all().await?;
        let Some(target) = questions.iter_mut().find(|q| q.id == id) else {
            return Ok(None);
        };
        target.apply_edit(edit, now);
        let updated = target.clone();
        self.save_all(&questions).await?;
        Ok(Some(updated))
    }

    pub async fn remove(&self, id: &str) -> Result<Option<Question>, RepositoryError> {
        let mut questions = self.load_all().await?;
        let Some(index) = questions.iter().position(|q| q.id == id) else {
            return Ok(None);
        };
        let removed = questions.remove(index);
        self.save_all(&questions).await?;
        Ok(Some(removed))
    }

    pub async fn answered(&self) -> Result<Vec<Question>, RepositoryError> {
        Ok(answered_newest_first(self.load_all().await?))
    }
}
