//! Session entity: the single owned value every orchestrator operation
//! threads through.

use super::budget::TimeBudget;
use super::coverage::CoverageTracker;
use crate::question::Question;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Lifecycle phase of a session. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionPhase {
    Setup,
    Active,
    Closing,
    Ended,
}

/// What the candidate's current speech is doing relative to the interview
/// flow.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    Answering,
    AskingQuestion,
    SeekingClarification,
    ConfusedOrStuck,
}

/// Structured judgment produced by the Reasoning Service for one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Score from 1-10.
    pub score: u8,
    pub feedback: String,
    #[serde(default)]
    pub suggestions: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    /// Optional suggested follow-up question.
    #[serde(default)]
    pub follow_up: Option<String>,
    /// Whether the answer fully covered the question.
    #[serde(default = "default_complete")]
    pub complete: bool,
}

fn default_complete() -> bool {
    true
}

/// One conversational turn, recorded append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    /// The question or prompt text posed to the candidate.
    pub prompt: String,
    /// Id of the question this turn belongs to, when one was in play.
    pub question_id: Option<String>,
    /// True when the prompt was a follow-up probe on its parent question.
    pub is_follow_up: bool,
    pub transcript: String,
    pub intent: Intent,
    /// Absent for non-answer intents.
    pub evaluation: Option<EvaluationResult>,
    pub timestamp: DateTime<Utc>,
}

/// One complete interview instance from start to summary.
///
/// Owned exclusively by its Session Orchestrator; mutated only through
/// orchestrator operations.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    /// Selected topics in their original order (the order is the
    /// deterministic tie-breaker for coverage decisions).
    pub topics: Vec<String>,
    /// Current difficulty, adapted as scores come in. 1-5.
    pub difficulty: u8,
    pub phase: SessionPhase,
    pub budget: TimeBudget,
    pub coverage: CoverageTracker,
    pub current_question: Option<Question>,
    /// Follow-up probes asked on the current question thread. 0..=max.
    pub follow_up_count: u8,
    pub exchanges: Vec<Exchange>,
    asked_ids: HashSet<String>,
    high_streak: u8,
    low_streak: u8,
}

impl Session {
    pub fn new(topics: Vec<String>, difficulty: u8, duration_secs: u64, now: DateTime<Utc>) -> Self {
        let coverage = CoverageTracker::new(&topics);
        Self {
            id: Uuid::new_v4().to_string(),
            topics,
            difficulty,
            phase: SessionPhase::Setup,
            budget: TimeBudget::new(now, duration_secs),
            coverage,
            current_question: None,
            follow_up_count: 0,
            exchanges: Vec::new(),
            asked_ids: HashSet::new(),
            high_streak: 0,
            low_streak: 0,
        }
    }

    /// Ids of every question issued this session (bank or generated).
    pub fn asked_ids(&self) -> &HashSet<String> {
        &self.asked_ids
    }

    /// Marks a question as issued: dedup set, coverage count, and the
    /// current-question slot all update together so accounting stays exact.
    pub fn mark_issued(&mut self, question: Question) {
        self.asked_ids.insert(question.id.clone());
        self.coverage.record(&question.topic, question.difficulty, None);
        self.current_question = Some(question);
    }

    /// Feeds an evaluation score into coverage and the difficulty
    /// adaptation streaks: +1 level after two consecutive scores >= 8,
    /// -1 after two <= 4, clamped to [1, 5].
    pub fn note_score(&mut self, score: u8) {
        if let Some(question) = &self.current_question {
            let topic = question.topic.clone();
            self.coverage.record_score(&topic, score);
        }
        if score >= 8 {
            self.high_streak += 1;
            self.low_streak = 0;
        } else if score <= 4 {
            self.low_streak += 1;
            self.high_streak = 0;
        } else {
            self.high_streak = 0;
            self.low_streak = 0;
        }
        if self.high_streak >= 2 {
            self.difficulty = (self.difficulty + 1).min(5);
            self.high_streak = 0;
        } else if self.low_streak >= 2 {
            self.difficulty = self.difficulty.saturating_sub(1).max(1);
            self.low_streak = 0;
        }
    }

    /// Appends one turn to the exchange history.
    pub fn record_exchange(&mut self, exchange: Exchange) {
        self.exchanges.push(exchange);
    }

    /// Transcripts from answer turns, most recent last.
    pub fn answer_transcripts(&self, limit: usize) -> Vec<String> {
        self.exchanges
            .iter()
            .filter(|e| e.intent == Intent::Answering)
            .rev()
            .take(limit)
            .map(|e| e.transcript.clone())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }

    /// Question texts issued so far, in order.
    pub fn asked_question_texts(&self) -> Vec<String> {
        let mut texts = Vec::new();
        let mut seen = HashSet::new();
        for exchange in &self.exchanges {
            if let Some(id) = &exchange.question_id {
                if !exchange.is_follow_up && seen.insert(id.clone()) {
                    texts.push(exchange.prompt.clone());
                }
            }
        }
        // the current question may not have an exchange yet
        if let Some(question) = &self.current_question {
            if seen.insert(question.id.clone()) {
                texts.push(question.text.clone());
            }
        }
        texts
    }
}
