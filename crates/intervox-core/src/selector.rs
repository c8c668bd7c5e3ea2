//! Hybrid question selection: bank-first, AI-generation fallback,
//! cross-topic synthesis.

use crate::config::EnginePolicy;
use crate::error::{InterviewError, Result};
use crate::question::{BankIndex, Question, QuestionBank, QuestionSource};
use crate::reasoning::{GenerateRequest, ReasoningService};
use crate::session::{Affordability, Session};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Id of the fixed wrap-up entry used when both bank and generation are
/// exhausted.
const WRAP_UP_ID: &str = "wrap-up";

/// How many prior questions/answers are handed to the generation call.
const GENERATION_HISTORY: usize = 5;

/// Chooses the next question for a session.
///
/// Strategies are tried in fixed priority order: bank lookup, AI generation
/// (with the remaining time passed through as a hard contract), and
/// cross-topic synthesis folded into the same generation call when at least
/// two topics are under-covered and time is comfortable.
pub struct QuestionSelector {
    index: BankIndex,
    reasoning: Arc<dyn ReasoningService>,
    policy: EnginePolicy,
}

impl QuestionSelector {
    pub fn new(
        bank: Arc<QuestionBank>,
        reasoning: Arc<dyn ReasoningService>,
        policy: EnginePolicy,
    ) -> Self {
        Self {
            index: BankIndex::new(bank),
            reasoning,
            policy,
        }
    }

    /// Selects, marks as issued, and returns the next question.
    ///
    /// Coverage accounting is updated exactly once, here, when the question
    /// is confirmed issued (not merely generated).
    ///
    /// # Errors
    ///
    /// Returns `SelectionExhausted` when no bank entry matches, generation
    /// failed, and no wrap-up question is configured (or it was already
    /// used). The caller is expected to close the session.
    pub async fn select_next(&self, session: &mut Session) -> Result<Question> {
        let affordability = session.budget.affordability(self.policy.exchange_cost_secs);
        if affordability == Affordability::Exhausted {
            return Err(InterviewError::SelectionExhausted);
        }

        let difficulty = match affordability {
            Affordability::Tight => session
                .difficulty
                .saturating_sub(self.policy.tight_difficulty_drop)
                .max(1),
            _ => session.difficulty,
        };

        // Bank-first; under time pressure the lookup runs at the reduced
        // difficulty so a shorter question comes back.
        if let Some(found) = self.index.find(
            &session.topics,
            difficulty,
            session.asked_ids(),
            &session.coverage,
        ) {
            let question = found.clone();
            info!(session_id = %session.id, question_id = %question.id, "selected bank question");
            session.mark_issued(question.clone());
            return Ok(question);
        }
        debug!(session_id = %session.id, "bank exhausted for current filter, generating");

        match self.generate(session, difficulty, affordability).await {
            Ok(question) => {
                session.mark_issued(question.clone());
                Ok(question)
            }
            Err(err) => {
                warn!(session_id = %session.id, %err, "question generation failed");
                let fallback = self.wrap_up_fallback(session)?;
                session.mark_issued(fallback.clone());
                Ok(fallback)
            }
        }
    }

    async fn generate(
        &self,
        session: &Session,
        difficulty: u8,
        affordability: Affordability,
    ) -> Result<Question> {
        let under_covered: Vec<String> = session
            .coverage
            .under_covered()
            .into_iter()
            .map(|t| t.to_string())
            .collect();

        let topics = if affordability == Affordability::Comfortable && under_covered.len() >= 2 {
            // cross-topic synthesis spans the two least-covered topics
            under_covered.into_iter().take(2).collect()
        } else {
            let topic = session
                .coverage
                .least_covered(&session.topics)
                .unwrap_or("general")
                .to_string();
            vec![topic]
        };

        let request = GenerateRequest {
            topics: topics.clone(),
            difficulty,
            prior_questions: tail(session.asked_question_texts(), GENERATION_HISTORY),
            prior_answers: session.answer_transcripts(GENERATION_HISTORY),
            remaining_seconds: session.budget.remaining(),
            first_question: session.coverage.total_asked() == 0,
        };

        let text = self.reasoning.generate_question(&request).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(InterviewError::SelectionExhausted);
        }
        info!(session_id = %session.id, topics = ?topics, "generated question");
        Ok(Question::generated(
            format!("gen-{}", Uuid::new_v4()),
            text,
            topics[0].clone(),
            difficulty,
        ))
    }

    fn wrap_up_fallback(&self, session: &Session) -> Result<Question> {
        let Some(text) = &self.policy.wrap_up_question else {
            return Err(InterviewError::SelectionExhausted);
        };
        if session.asked_ids().contains(WRAP_UP_ID) {
            return Err(InterviewError::SelectionExhausted);
        }
        let topic = session
            .topics
            .first()
            .cloned()
            .unwrap_or_else(|| "general".to_string());
        Ok(Question {
            id: WRAP_UP_ID.to_string(),
            text: text.clone(),
            topic,
            difficulty: 1,
            expected_answer: None,
            follow_ups: Vec::new(),
            source: QuestionSource::Bank,
        })
    }
}

fn tail(mut items: Vec<String>, limit: usize) -> Vec<String> {
    if items.len() > limit {
        items.drain(..items.len() - limit);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceKind;
    use crate::reasoning::{
        ClassifyRequest, EvaluateRequest, FollowUpRequest, MetaRequest,
    };
    use crate::session::{EvaluationResult, Intent};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    struct RecordingReasoning {
        response: Result<String>,
        requests: Mutex<Vec<GenerateRequest>>,
    }

    impl RecordingReasoning {
        fn ok(text: &str) -> Self {
            Self {
                response: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                response: Err(InterviewError::service_failure(
                    ServiceKind::Reasoning,
                    "timeout",
                    true,
                )),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn last_request(&self) -> GenerateRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl ReasoningService for RecordingReasoning {
        async fn classify(&self, _request: &ClassifyRequest) -> Result<Intent> {
            unimplemented!()
        }

        async fn evaluate(&self, _request: &EvaluateRequest) -> Result<EvaluationResult> {
            unimplemented!()
        }

        async fn generate_question(&self, request: &GenerateRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            self.response.clone()
        }

        async fn generate_follow_up(&self, _request: &FollowUpRequest) -> Result<Option<String>> {
            unimplemented!()
        }

        async fn respond_to_meta(&self, _request: &MetaRequest) -> Result<String> {
            unimplemented!()
        }
    }

    fn bank_question(id: &str, topic: &str, difficulty: u8) -> Question {
        Question {
            id: id.to_string(),
            text: format!("{id} text"),
            topic: topic.to_string(),
            difficulty,
            expected_answer: None,
            follow_ups: vec![],
            source: QuestionSource::Bank,
        }
    }

    fn bank(questions: Vec<Question>) -> Arc<QuestionBank> {
        Arc::new(QuestionBank::new(questions).unwrap())
    }

    fn session(topics: &[&str], duration_secs: u64) -> Session {
        Session::new(
            topics.iter().map(|s| s.to_string()).collect(),
            3,
            duration_secs,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn bank_first_when_a_match_exists() {
        let reasoning = Arc::new(RecordingReasoning::ok("unused"));
        let selector = QuestionSelector::new(
            bank(vec![bank_question("prog_1", "programming", 3)]),
            reasoning.clone(),
            EnginePolicy::default(),
        );
        let mut session = session(&["programming"], 3600);

        let question = selector.select_next(&mut session).await.unwrap();
        assert_eq!(question.id, "prog_1");
        assert_eq!(question.source, QuestionSource::Bank);
        assert_eq!(session.coverage.total_asked(), 1);
        assert!(reasoning.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bank_exhaustion_falls_back_to_generation() {
        // one question per topic at difficulty 3; session covers only
        // "programming", so the second selection must generate
        let reasoning = Arc::new(RecordingReasoning::ok(
            "How would you profile a slow function?",
        ));
        let selector = QuestionSelector::new(
            bank(vec![
                bank_question("prog_1", "programming", 3),
                bank_question("db_1", "databases", 3),
            ]),
            reasoning.clone(),
            EnginePolicy::default(),
        );
        let mut session = session(&["programming"], 3600);

        let first = selector.select_next(&mut session).await.unwrap();
        assert_eq!(first.id, "prog_1");

        let second = selector.select_next(&mut session).await.unwrap();
        assert_eq!(second.source, QuestionSource::Generated);
        assert_eq!(second.topic, "programming");
        assert_eq!(session.coverage.total_asked(), 2);

        let request = reasoning.last_request();
        assert!(request.remaining_seconds > 0, "remaining time is a hard input contract");
        assert_eq!(request.prior_questions, vec!["prog_1 text".to_string()]);
    }

    #[tokio::test]
    async fn adapted_difficulty_reaches_generation() {
        let reasoning = Arc::new(RecordingReasoning::ok("Describe a B-tree split."));
        let selector = QuestionSelector::new(
            bank(vec![]),
            reasoning.clone(),
            EnginePolicy::default(),
        );
        let mut session = session(&["databases"], 3600);
        session.note_score(9);
        session.note_score(9);
        assert_eq!(session.difficulty, 4);

        selector.select_next(&mut session).await.unwrap();
        assert_eq!(reasoning.last_request().difficulty, 4);
    }

    #[tokio::test]
    async fn tight_time_generates_at_reduced_difficulty() {
        let reasoning = Arc::new(RecordingReasoning::ok("Name one index type."));
        let selector = QuestionSelector::new(
            bank(vec![]),
            reasoning.clone(),
            EnginePolicy::default(),
        );
        // 120s remaining is below 3 * 90s
        let mut session = session(&["databases"], 120);

        let question = selector.select_next(&mut session).await.unwrap();
        assert_eq!(question.source, QuestionSource::Generated);
        assert_eq!(reasoning.last_request().difficulty, 2);
    }

    #[tokio::test]
    async fn tight_time_still_returns_a_bank_match() {
        let reasoning = Arc::new(RecordingReasoning::ok("unused"));
        let selector = QuestionSelector::new(
            bank(vec![bank_question("db_1", "databases", 2)]),
            reasoning.clone(),
            EnginePolicy::default(),
        );
        let mut session = session(&["databases"], 120);

        let question = selector.select_next(&mut session).await.unwrap();
        assert_eq!(question.id, "db_1");
        assert!(reasoning.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cross_topic_synthesis_supplies_two_topics() {
        let reasoning = Arc::new(RecordingReasoning::ok(
            "How would you store a parse tree relationally?",
        ));
        let selector = QuestionSelector::new(
            bank(vec![]),
            reasoning.clone(),
            EnginePolicy::default(),
        );
        let mut session = session(&["programming", "databases"], 3600);
        // one networking-free question asked on a third topic keeps both
        // session topics strictly under fair share
        session.mark_issued(bank_question("warmup", "warmup", 1));

        selector.select_next(&mut session).await.unwrap();
        let request = reasoning.last_request();
        assert_eq!(
            request.topics,
            vec!["programming".to_string(), "databases".to_string()]
        );
    }

    #[tokio::test]
    async fn exhausted_budget_never_selects() {
        let reasoning = Arc::new(RecordingReasoning::ok("unused"));
        let selector = QuestionSelector::new(
            bank(vec![bank_question("prog_1", "programming", 3)]),
            reasoning,
            EnginePolicy::default(),
        );
        let mut session = session(&["programming"], 0);

        let result = selector.select_next(&mut session).await;
        assert!(matches!(result, Err(InterviewError::SelectionExhausted)));
    }

    #[tokio::test]
    async fn generation_failure_uses_wrap_up_once() {
        let reasoning = Arc::new(RecordingReasoning::failing());
        let policy = EnginePolicy {
            wrap_up_question: Some("Any final thoughts on the topics we covered?".to_string()),
            ..EnginePolicy::default()
        };
        let selector = QuestionSelector::new(bank(vec![]), reasoning, policy);
        let mut session = session(&["programming"], 3600);

        let question = selector.select_next(&mut session).await.unwrap();
        assert_eq!(question.id, "wrap-up");

        let result = selector.select_next(&mut session).await;
        assert!(matches!(result, Err(InterviewError::SelectionExhausted)));
    }

    #[tokio::test]
    async fn generation_failure_without_wrap_up_is_exhausted() {
        let reasoning = Arc::new(RecordingReasoning::failing());
        let selector = QuestionSelector::new(bank(vec![]), reasoning, EnginePolicy::default());
        let mut session = session(&["programming"], 3600);

        let result = selector.select_next(&mut session).await;
        assert!(matches!(result, Err(InterviewError::SelectionExhausted)));
    }
}
