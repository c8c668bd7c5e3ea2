//! The Reasoning Service boundary.
//!
//! The engine never depends on prompt text, only on these structured
//! request/response contracts. Implementers may back the trait with any
//! language-model provider (see `intervox-interaction` for the HTTP one).

use crate::error::Result;
use crate::session::{EvaluationResult, Intent};
use async_trait::async_trait;
use serde::Serialize;

/// Context for classifying what the candidate's speech is doing.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyRequest {
    pub transcript: String,
    pub current_question: Option<String>,
    /// Whether an answer is currently awaited.
    pub awaiting_answer: bool,
    pub follow_ups_asked: u8,
}

/// Context for evaluating an answer against the current question.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateRequest {
    pub question: String,
    pub expected_answer: Option<String>,
    pub answer: String,
    pub topic: String,
    pub difficulty: u8,
}

/// Context for generating a fresh question.
///
/// `remaining_seconds` is a hard input contract: generated questions must
/// be scoped to be answerable within the budget.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// One topic, or two for a cross-topic synthesis question.
    pub topics: Vec<String>,
    pub difficulty: u8,
    pub prior_questions: Vec<String>,
    pub prior_answers: Vec<String>,
    pub remaining_seconds: u64,
    pub first_question: bool,
}

/// Context for generating a follow-up probe on an evaluated answer.
#[derive(Debug, Clone, Serialize)]
pub struct FollowUpRequest {
    pub question: String,
    pub answer: String,
    pub feedback: String,
    pub topic: String,
}

/// Kinds of direct response to a non-answer intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaKind {
    /// The candidate asked the interviewer a question.
    CandidateQuestion,
    /// The candidate wants the current question clarified or repeated.
    Clarification,
    /// The candidate is confused or stuck and needs a hint.
    Encouragement,
}

/// Context for synthesizing a direct response to a meta-intent.
#[derive(Debug, Clone, Serialize)]
pub struct MetaRequest {
    pub kind: MetaKind,
    pub transcript: String,
    pub current_question: Option<String>,
    pub topics: Vec<String>,
    pub remaining_seconds: u64,
}

/// Natural-language capabilities the engine orchestrates but never
/// performs itself.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Classifies a transcript against the current session phase.
    async fn classify(&self, request: &ClassifyRequest) -> Result<Intent>;

    /// Evaluates an answer, returning a structured judgment.
    async fn evaluate(&self, request: &EvaluateRequest) -> Result<EvaluationResult>;

    /// Generates a fresh question scoped to the remaining time.
    async fn generate_question(&self, request: &GenerateRequest) -> Result<String>;

    /// Generates follow-up probe text, or `None` when nothing usable came
    /// back.
    async fn generate_follow_up(&self, request: &FollowUpRequest) -> Result<Option<String>>;

    /// Answers a candidate's meta-question, clarifies, or offers a hint.
    async fn respond_to_meta(&self, request: &MetaRequest) -> Result<String>;
}
