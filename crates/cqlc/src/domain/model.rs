//! Domain models for quiz questions and their answers.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::range::TextRange;

/// Answer lifecycle of a question.
///
/// The store document encodes this as optional `answer`/`answeredAt` fields;
/// keeping it as a sum type means a record can never be half answered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnswerState {
    #[default]
    Unanswered,
    Answered { text: String, answered_at: i64 },
}

impl AnswerState {
    pub fn is_answered(&self) -> bool {
        matches!(self, AnswerState::Answered { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            AnswerState::Answered { text, .. } => Some(text),
            AnswerState::Unanswered => None,
        }
    }

    pub fn answered_at(&self) -> Option<i64> {
        match self {
            AnswerState::Answered { answered_at, .. } => Some(*answered_at),
            AnswerState::Unanswered => None,
        }
    }
}

/// A teacher-authored question anchored to a range of a workspace file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredRecord", into = "StoredRecord")]
pub struct QuestionRecord {
    pub id: String,
    /// Workspace-relative path the range anchors to.
    pub file_path: String,
    pub range: TextRange,
    /// Source text captured when the question was asked.
    pub snippet: String,
    pub question: String,
    pub answer: AnswerState,
    /// Epoch milliseconds.
    pub asked_at: i64,
    /// Skipped by quiz generation when set.
    pub excluded: bool,
}

impl QuestionRecord {
    pub fn new(
        id: impl Into<String>,
        file_path: impl Into<String>,
        range: TextRange,
        snippet: impl Into<String>,
        question: impl Into<String>,
        asked_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            file_path: file_path.into(),
            range,
            snippet: snippet.into(),
            question: question.into(),
            answer: AnswerState::Unanswered,
            asked_at,
            excluded: false,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.answer.is_answered()
    }
}

/// Wire shape of a record inside the store document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    id: String,
    file_path: String,
    range: TextRange,
    snippet: String,
    question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    answer: Option<String>,
    asked_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    answered_at: Option<i64>,
    #[serde(default, skip_serializing_if = "is_false")]
    exclude: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TryFrom<StoredRecord> for QuestionRecord {
    type Error = String;

    fn try_from(value: StoredRecord) -> Result<Self, Self::Error> {
        let answer = match (value.answer, value.answered_at) {
            (Some(text), Some(answered_at)) if !text.is_empty() => {
                AnswerState::Answered { text, answered_at }
            }
            (Some(text), None) if !text.is_empty() => {
                return Err(format!(
                    "question '{}' has an answer but no answeredAt",
                    value.id
                ));
            }
            _ => AnswerState::Unanswered,
        };

        Ok(Self {
            id: value.id,
            file_path: value.file_path,
            range: value.range,
            snippet: value.snippet,
            question: value.question,
            answer,
            asked_at: value.asked_at,
            excluded: value.exclude,
        })
    }
}

impl From<QuestionRecord> for StoredRecord {
    fn from(value: QuestionRecord) -> Self {
        let (answer, answered_at) = match value.answer {
            AnswerState::Answered { text, answered_at } => (Some(text), Some(answered_at)),
            AnswerState::Unanswered => (None, None),
        };
        Self {
            id: value.id,
            file_path: value.file_path,
            range: value.range,
            snippet: value.snippet,
            question: value.question,
            answer,
            asked_at: value.asked_at,
            answered_at,
            exclude: value.excluded,
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Generate a question id: base-36 creation time plus a random suffix.
pub fn make_id(now_millis: i64) -> String {
    let suffix: String = to_base36(Uuid::new_v4().as_u128())
        .chars()
        .take(7)
        .collect();
    format!("{}-{suffix}", to_base36(now_millis.max(0) as u128))
}

fn to_base36(mut value: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".into();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
