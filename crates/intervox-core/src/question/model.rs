//! Question entity and the immutable question bank.

use crate::error::{InterviewError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Where a question came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    /// Statically predefined reference data loaded at startup.
    #[default]
    Bank,
    /// Produced on demand by the Reasoning Service.
    Generated,
    /// A probe variant of an already-asked parent question.
    FollowUp,
}

/// A single interview question.
///
/// Bank questions are immutable reference data; generated questions are
/// created per-session and owned by that session's exchange history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub topic: String,
    /// Difficulty on a 1-5 ordinal scale.
    pub difficulty: u8,
    #[serde(default)]
    pub expected_answer: Option<String>,
    /// Suggested probe texts, in preference order.
    #[serde(default, rename = "follow_up_questions")]
    pub follow_ups: Vec<String>,
    #[serde(default)]
    pub source: QuestionSource,
}

impl Question {
    /// Builds a question generated by the Reasoning Service for one session.
    pub fn generated(id: impl Into<String>, text: impl Into<String>, topic: impl Into<String>, difficulty: u8) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            topic: topic.into(),
            difficulty,
            expected_answer: None,
            follow_ups: Vec::new(),
            source: QuestionSource::Generated,
        }
    }
}

/// The immutable question bank, loaded once at process start.
///
/// Safe for unsynchronized concurrent reads across sessions; typically
/// shared as `Arc<QuestionBank>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Validates and wraps an ordered list of bank questions.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error on duplicate ids, empty question text, or a
    /// difficulty outside 1-5.
    pub fn new(questions: Vec<Question>) -> Result<Self> {
        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id.as_str()) {
                return Err(InterviewError::config(format!(
                    "duplicate question id in bank: '{}'",
                    question.id
                )));
            }
            if question.text.trim().is_empty() {
                return Err(InterviewError::config(format!(
                    "question '{}' has empty text",
                    question.id
                )));
            }
            if !(1..=5).contains(&question.difficulty) {
                return Err(InterviewError::config(format!(
                    "question '{}' has invalid difficulty: {}",
                    question.id, question.difficulty
                )));
            }
        }
        Ok(Self { questions })
    }

    /// All bank entries in stable insertion order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Distinct topics in the bank, sorted alphabetically.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .questions
            .iter()
            .map(|q| q.topic.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        topics.sort();
        topics
    }

    /// The (min, max) difficulty levels present, or (1, 5) for an empty bank.
    pub fn difficulty_range(&self) -> (u8, u8) {
        let difficulties = self.questions.iter().map(|q| q.difficulty);
        match (difficulties.clone().min(), difficulties.max()) {
            (Some(min), Some(max)) => (min, max),
            _ => (1, 5),
        }
    }
}
