//! Capability seams for the two outbound calls a round makes, plus the
//! parsing of the JSON the language model sends back.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::quiz::{
    Difficulty, House, Question, SortingResult, OPTIONS_PER_QUESTION, QUESTIONS_PER_ROUND,
};

/// Shown when the questions arrived but could not be understood.
pub const MAGIC_FAILED: &str = "The magic failed. Try casting the spell again.";
/// Shown when the questions never arrived.
pub const DARK_SPELL: &str = "A dark spell disrupted our communication.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClassifyRequest {
    pub correct: u32,
    pub total: u32,
    pub difficulty: Difficulty,
}

/// Authors the questions of a round.
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    async fn fetch_questions(&self, difficulty: Difficulty) -> Result<Vec<Question>, ProviderError>;
}

/// Picks a house for a finished round.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, request: ClassifyRequest) -> Result<SortingResult, ClassificationError>;
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("question service request failed: {0}")]
    Service(String),
    #[error("question service returned unparsable content: {0}")]
    Malformed(String),
    #[error("question service returned no questions")]
    Empty,
    #[error("expected {expected} questions, got {actual}")]
    WrongCount { expected: usize, actual: usize },
    #[error("question #{index} is invalid: {reason}")]
    InvalidQuestion { index: usize, reason: &'static str },
    #[error("question service did not answer within {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ProviderError::Service(_) | ProviderError::Timeout(_) => DARK_SPELL,
            ProviderError::Malformed(_)
            | ProviderError::Empty
            | ProviderError::WrongCount { .. }
            | ProviderError::InvalidQuestion { .. } => MAGIC_FAILED,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClassificationError {
    #[error("sorting service request failed: {0}")]
    Service(String),
    #[error("sorting service returned unparsable content: {0}")]
    Malformed(String),
    #[error("sorting service picked an unknown house: {0:?}")]
    UnknownHouse(String),
    #[error("sorting service did not answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    question: String,
    options: Vec<String>,
    correct_index: f64,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionsPayload {
    List(Vec<RawQuestion>),
    Wrapped { questions: Vec<RawQuestion> },
}

#[derive(Deserialize)]
struct RawSorting {
    house: String,
    #[serde(alias = "narrative")]
    dialogue: String,
}

/// Models like to wrap JSON in a markdown fence even when asked not to.
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

pub fn parse_questions(content: &str) -> Result<Vec<Question>, ProviderError> {
    let payload: QuestionsPayload = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| ProviderError::Malformed(e.to_string()))?;
    let raw = match payload {
        QuestionsPayload::List(list) => list,
        QuestionsPayload::Wrapped { questions } => questions,
    };

    if raw.is_empty() {
        return Err(ProviderError::Empty);
    }
    if raw.len() != QUESTIONS_PER_ROUND {
        return Err(ProviderError::WrongCount {
            expected: QUESTIONS_PER_ROUND,
            actual: raw.len(),
        });
    }

    raw.into_iter()
        .enumerate()
        .map(|(i, q)| validate_question(i + 1, q))
        .collect()
}

fn validate_question(index: usize, raw: RawQuestion) -> Result<Question, ProviderError> {
    let invalid = |reason| ProviderError::InvalidQuestion { index, reason };

    if raw.question.trim().is_empty() {
        return Err(invalid("empty prompt"));
    }
    if raw.options.len() != OPTIONS_PER_QUESTION {
        return Err(invalid("expected exactly four options"));
    }
    if raw.options.iter().any(|o| o.trim().is_empty()) {
        return Err(invalid("empty option"));
    }
    let max = (OPTIONS_PER_QUESTION - 1) as f64;
    if raw.correct_index.fract() != 0.0 || !(0.0..=max).contains(&raw.correct_index) {
        return Err(invalid("correct index out of range"));
    }

    let question = Question::new(
        raw.question.trim().to_string(),
        raw.options.into_iter().map(|o| o.trim().to_string()).collect(),
        raw.correct_index as usize,
    );
    Ok(match raw.explanation {
        Some(explanation) if !explanation.trim().is_empty() => {
            question.with_explanation(explanation.trim())
        }
        _ => question,
    })
}

pub fn parse_sorting(content: &str) -> Result<SortingResult, ClassificationError> {
    let raw: RawSorting = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| ClassificationError::Malformed(e.to_string()))?;
    let house = House::parse(&raw.house).ok_or(ClassificationError::UnknownHouse(raw.house))?;
    if raw.dialogue.trim().is_empty() {
        return Err(ClassificationError::Malformed("empty dialogue".to_string()));
    }
    Ok(SortingResult {
        house,
        narrative: raw.dialogue.trim().to_string(),
    })
}
