//! Probe-or-advance decision after an evaluated answer.
//!
//! The decision itself is deterministic; the Reasoning Service only supplies
//! the *content* of a follow-up, never whether one occurs.

use crate::reasoning::{FollowUpRequest, ReasoningService};
use crate::session::{Affordability, EvaluationResult, Session};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of the follow-up decision.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUpDecision {
    /// Probe deeper on the current question with this text.
    FollowUp(String),
    /// Move on to a fresh question.
    NewQuestion,
}

/// Decides, after an answer is evaluated, whether to probe deeper or
/// advance.
pub struct FollowUpEngine {
    reasoning: Arc<dyn ReasoningService>,
    max_follow_ups: u8,
}

impl FollowUpEngine {
    pub fn new(reasoning: Arc<dyn ReasoningService>, max_follow_ups: u8) -> Self {
        Self {
            reasoning,
            max_follow_ups,
        }
    }

    /// Applies the decision precedence:
    ///
    /// 1. Counter at its maximum always advances.
    /// 2. Exhausted time never reaches this engine (the orchestrator
    ///    short-circuits), but advances defensively if it does.
    /// 3. Tight time advances, except one last clarifying probe when the
    ///    score is ambiguous (4-6) and no follow-up has been asked yet.
    /// 4. Otherwise a probe is requested when the score is below 8 or the
    ///    answer was incomplete; unusable probe text falls back to advance.
    pub async fn decide(
        &self,
        evaluation: &EvaluationResult,
        session: &Session,
        affordability: Affordability,
    ) -> FollowUpDecision {
        if session.follow_up_count >= self.max_follow_ups {
            debug!(session_id = %session.id, "follow-up budget spent, advancing");
            return FollowUpDecision::NewQuestion;
        }

        match affordability {
            Affordability::Exhausted => return FollowUpDecision::NewQuestion,
            Affordability::Tight => {
                let ambiguous = (4..=6).contains(&evaluation.score);
                if !(ambiguous && session.follow_up_count == 0) {
                    return FollowUpDecision::NewQuestion;
                }
            }
            Affordability::Comfortable => {}
        }

        if evaluation.score >= 8 && evaluation.complete {
            return FollowUpDecision::NewQuestion;
        }

        // Content, in preference order: the evaluator's own suggestion, the
        // bank question's scripted probes, then a generation call.
        if let Some(text) = &evaluation.follow_up {
            if usable(text) {
                return FollowUpDecision::FollowUp(text.trim().to_string());
            }
        }
        if let Some(question) = &session.current_question {
            if let Some(text) = question.follow_ups.get(usize::from(session.follow_up_count)) {
                if usable(text) {
                    return FollowUpDecision::FollowUp(text.trim().to_string());
                }
            }
        }

        let Some(question) = &session.current_question else {
            return FollowUpDecision::NewQuestion;
        };
        let request = FollowUpRequest {
            question: question.text.clone(),
            answer: session
                .exchanges
                .last()
                .map(|e| e.transcript.clone())
                .unwrap_or_default(),
            feedback: evaluation.feedback.clone(),
            topic: question.topic.clone(),
        };
        match self.reasoning.generate_follow_up(&request).await {
            Ok(Some(text)) if usable(&text) => FollowUpDecision::FollowUp(text.trim().to_string()),
            Ok(_) => FollowUpDecision::NewQuestion,
            Err(err) => {
                warn!(session_id = %session.id, %err, "follow-up generation failed, advancing");
                FollowUpDecision::NewQuestion
            }
        }
    }
}

fn usable(text: &str) -> bool {
    text.trim().len() > 10
}
