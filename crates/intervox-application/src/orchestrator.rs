//! Per-session orchestrator: owns one `Session` and drives the full turn
//! loop from transcript in to next prompt out.

use crate::message::ActionKind;
use chrono::Utc;
use intervox_core::config::EnginePolicy;
use intervox_core::error::{InterviewError, Result};
use intervox_core::followup::{FollowUpDecision, FollowUpEngine};
use intervox_core::question::QuestionBank;
use intervox_core::reasoning::{EvaluateRequest, MetaKind, MetaRequest, ReasoningService};
use intervox_core::router::IntentRouter;
use intervox_core::selector::QuestionSelector;
use intervox_core::session::{
    Affordability, Exchange, Intent, Session, SessionPhase, SessionSummary,
};
use std::sync::Arc;
use tracing::{info, warn};

const RETRY_PROMPT: &str =
    "I had trouble processing your response. Could you please repeat that?";
const EMPTY_TRANSCRIPT_PROMPT: &str =
    "I didn't catch that. Could you say it again?";
const QUESTION_FALLBACK: &str = "That's a good question. Let me come back to it after the \
    interview. For now, let's continue with the current question.";
const ENCOURAGEMENT_FALLBACK: &str = "That's okay, take your time. Try to think about the \
    key concepts involved and describe what you do know.";

/// What the engine wants the client to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineAction {
    /// Pose this prompt to the candidate.
    Ask {
        kind: ActionKind,
        text: String,
        remaining_seconds: u64,
    },
    /// The session is over; deliver the summary.
    End(SessionSummary),
}

/// Drives one interview session through its turn loop.
///
/// Owns the `Session` exclusively; callers serialize access (see
/// `SessionRegistry`), so every operation takes `&mut self` and there is no
/// interior locking here.
pub struct SessionOrchestrator {
    session: Session,
    selector: QuestionSelector,
    router: IntentRouter,
    follow_up: FollowUpEngine,
    reasoning: Arc<dyn ReasoningService>,
    policy: EnginePolicy,
    /// Text of the prompt currently awaiting an answer. Differs from the
    /// current question's text while a follow-up probe is in play.
    pending_prompt: Option<String>,
    /// Consecutive reasoning failures while evaluating, reset on success.
    consecutive_failures: u8,
    summary: Option<SessionSummary>,
}

impl SessionOrchestrator {
    /// Validates the session parameters and builds the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns `MalformedMessage` for empty topics, a difficulty outside
    /// 1-5, or a zero duration.
    pub fn new(
        topics: Vec<String>,
        difficulty: u8,
        duration_secs: u64,
        bank: Arc<QuestionBank>,
        reasoning: Arc<dyn ReasoningService>,
        policy: EnginePolicy,
    ) -> Result<Self> {
        if topics.is_empty() || topics.iter().any(|t| t.trim().is_empty()) {
            return Err(InterviewError::malformed("topics must be non-empty"));
        }
        if !(1..=5).contains(&difficulty) {
            return Err(InterviewError::malformed(format!(
                "difficulty must be 1-5, got {difficulty}"
            )));
        }
        if duration_secs == 0 {
            return Err(InterviewError::malformed("duration must be positive"));
        }
        let session = Session::new(topics, difficulty, duration_secs, Utc::now());
        Ok(Self {
            selector: QuestionSelector::new(bank, reasoning.clone(), policy.clone()),
            router: IntentRouter::new(reasoning.clone()),
            follow_up: FollowUpEngine::new(reasoning.clone(), policy.max_follow_ups),
            session,
            reasoning,
            policy,
            pending_prompt: None,
            consecutive_failures: 0,
            summary: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.session.id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Activates the session and issues the opening question.
    pub async fn start(&mut self) -> Result<EngineAction> {
        if self.session.phase != SessionPhase::Setup {
            return Err(InterviewError::internal("session already started"));
        }
        self.session.phase = SessionPhase::Active;
        info!(session_id = %self.session.id, topics = ?self.session.topics, "session started");
        match self.selector.select_next(&mut self.session).await {
            Ok(question) => Ok(self.ask(ActionKind::Question, question.text)),
            Err(InterviewError::SelectionExhausted) => Ok(EngineAction::End(self.end())),
            Err(err) => Err(err),
        }
    }

    /// Processes one candidate utterance and decides the next action.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSession` once the session has ended; service
    /// failures inside the turn degrade per-step instead of surfacing.
    pub async fn handle_transcript(&mut self, transcript: &str) -> Result<EngineAction> {
        match self.session.phase {
            SessionPhase::Ended => {
                return Err(InterviewError::invalid_session(self.session.id.clone()));
            }
            SessionPhase::Setup => {
                return Err(InterviewError::internal("session not started"));
            }
            SessionPhase::Active | SessionPhase::Closing => {}
        }

        // A spent budget closes the session before the utterance is
        // processed, whatever its intent.
        let affordability = self
            .session
            .budget
            .affordability(self.policy.exchange_cost_secs);
        if affordability == Affordability::Exhausted {
            info!(session_id = %self.session.id, "time budget exhausted");
            return Ok(EngineAction::End(self.end()));
        }

        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Ok(self.ask(ActionKind::Guidance, EMPTY_TRANSCRIPT_PROMPT.to_string()));
        }

        let intent = self.router.classify(transcript, &self.session).await;
        match intent {
            Intent::Answering => self.handle_answer(transcript).await,
            Intent::AskingQuestion => {
                self.handle_meta(transcript, intent, MetaKind::CandidateQuestion)
                    .await
            }
            Intent::SeekingClarification => {
                self.handle_meta(transcript, intent, MetaKind::Clarification)
                    .await
            }
            Intent::ConfusedOrStuck => {
                self.handle_meta(transcript, intent, MetaKind::Encouragement)
                    .await
            }
        }
    }

    /// Ends the session and freezes the summary. Idempotent.
    pub fn end(&mut self) -> SessionSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }
        self.session.phase = SessionPhase::Closing;
        let summary = SessionSummary::from_session(&self.session);
        self.session.phase = SessionPhase::Ended;
        self.summary = Some(summary.clone());
        info!(
            session_id = %self.session.id,
            questions = summary.questions_asked,
            average = summary.average_score,
            "session ended"
        );
        summary
    }

    async fn handle_answer(&mut self, transcript: &str) -> Result<EngineAction> {
        let Some(question) = self.session.current_question.clone() else {
            // no question in play (e.g. classification drift), advance
            return self.advance().await;
        };

        let request = EvaluateRequest {
            question: question.text.clone(),
            expected_answer: question.expected_answer.clone(),
            answer: transcript.to_string(),
            topic: question.topic.clone(),
            difficulty: question.difficulty,
        };
        let evaluation = match self.reasoning.evaluate(&request).await {
            Ok(evaluation) => {
                self.consecutive_failures = 0;
                evaluation
            }
            Err(err) => {
                self.consecutive_failures += 1;
                warn!(
                    session_id = %self.session.id,
                    %err,
                    failures = self.consecutive_failures,
                    "answer evaluation failed"
                );
                if self.consecutive_failures >= 2 {
                    return Ok(EngineAction::End(self.end()));
                }
                return Ok(self.ask(ActionKind::Guidance, RETRY_PROMPT.to_string()));
            }
        };

        let prompt = self
            .pending_prompt
            .clone()
            .unwrap_or_else(|| question.text.clone());
        self.session.record_exchange(Exchange {
            prompt,
            question_id: Some(question.id.clone()),
            is_follow_up: self.session.follow_up_count > 0,
            transcript: transcript.to_string(),
            intent: Intent::Answering,
            evaluation: Some(evaluation.clone()),
            timestamp: Utc::now(),
        });
        self.session.note_score(evaluation.score);

        if let Some(max) = self.policy.max_exchanges {
            if self.session.exchanges.len() as u32 >= max {
                info!(session_id = %self.session.id, "exchange limit reached");
                return Ok(EngineAction::End(self.end()));
            }
        }

        let affordability = self
            .session
            .budget
            .affordability(self.policy.exchange_cost_secs);
        if affordability == Affordability::Exhausted {
            return Ok(EngineAction::End(self.end()));
        }

        match self
            .follow_up
            .decide(&evaluation, &self.session, affordability)
            .await
        {
            FollowUpDecision::FollowUp(text) => {
                self.session.follow_up_count += 1;
                Ok(self.ask(ActionKind::FollowUp, text))
            }
            FollowUpDecision::NewQuestion => self.advance().await,
        }
    }

    async fn handle_meta(
        &mut self,
        transcript: &str,
        intent: Intent,
        kind: MetaKind,
    ) -> Result<EngineAction> {
        let request = MetaRequest {
            kind,
            transcript: transcript.to_string(),
            current_question: self
                .session
                .current_question
                .as_ref()
                .map(|q| q.text.clone()),
            topics: self.session.topics.clone(),
            remaining_seconds: self.session.budget.remaining(),
        };
        let text = match self.reasoning.respond_to_meta(&request).await {
            Ok(text) => text,
            Err(err) => {
                warn!(session_id = %self.session.id, %err, "meta response failed, using fallback");
                self.meta_fallback(kind)
            }
        };

        let prompt = self.pending_prompt.clone().unwrap_or_default();
        self.session.record_exchange(Exchange {
            prompt,
            question_id: self.session.current_question.as_ref().map(|q| q.id.clone()),
            is_follow_up: false,
            transcript: transcript.to_string(),
            intent,
            evaluation: None,
            timestamp: Utc::now(),
        });
        Ok(self.ask(ActionKind::Guidance, text))
    }

    /// Moves on to a fresh question; exhaustion closes the session.
    async fn advance(&mut self) -> Result<EngineAction> {
        self.session.follow_up_count = 0;
        match self.selector.select_next(&mut self.session).await {
            Ok(question) => Ok(self.ask(ActionKind::Question, question.text)),
            Err(InterviewError::SelectionExhausted) => Ok(EngineAction::End(self.end())),
            Err(err) => Err(err),
        }
    }

    fn meta_fallback(&self, kind: MetaKind) -> String {
        match kind {
            MetaKind::CandidateQuestion => QUESTION_FALLBACK.to_string(),
            MetaKind::Clarification => match &self.session.current_question {
                Some(question) => format!("Let me repeat the question: {}", question.text),
                None => ENCOURAGEMENT_FALLBACK.to_string(),
            },
            MetaKind::Encouragement => ENCOURAGEMENT_FALLBACK.to_string(),
        }
    }

    fn ask(&mut self, kind: ActionKind, text: String) -> EngineAction {
        if kind != ActionKind::Guidance {
            self.pending_prompt = Some(text.clone());
        }
        EngineAction::Ask {
            kind,
            text,
            remaining_seconds: self.session.budget.remaining(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use intervox_core::error::ServiceKind;
    use intervox_core::question::{Question, QuestionSource};
    use intervox_core::reasoning::{
        ClassifyRequest, FollowUpRequest, GenerateRequest,
    };
    use intervox_core::session::EvaluationResult;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted reasoning mock: fixed classification, queued evaluation
    /// results, fixed generation text.
    struct ScriptedReasoning {
        intent: Intent,
        evaluations: Mutex<VecDeque<Result<EvaluationResult>>>,
        generated: Result<String>,
        meta: Result<String>,
    }

    impl ScriptedReasoning {
        fn answering(evaluations: Vec<Result<EvaluationResult>>) -> Self {
            Self {
                intent: Intent::Answering,
                evaluations: Mutex::new(evaluations.into()),
                generated: Ok("Generated: describe a recent project.".to_string()),
                meta: Ok("Of course, here is some guidance.".to_string()),
            }
        }

        fn with_intent(mut self, intent: Intent) -> Self {
            self.intent = intent;
            self
        }

        fn with_meta(mut self, meta: Result<String>) -> Self {
            self.meta = meta;
            self
        }

        fn without_generation(mut self) -> Self {
            self.generated = Err(service_err());
            self
        }
    }

    fn service_err() -> InterviewError {
        InterviewError::service_failure(ServiceKind::Reasoning, "timeout", true)
    }

    fn evaluation(score: u8) -> EvaluationResult {
        EvaluationResult {
            score,
            feedback: "noted".to_string(),
            suggestions: String::new(),
            strengths: vec![],
            weaknesses: vec![],
            follow_up: Some("Could you expand on the trade-offs?".to_string()),
            complete: score >= 8,
        }
    }

    #[async_trait]
    impl ReasoningService for ScriptedReasoning {
        async fn classify(&self, _request: &ClassifyRequest) -> Result<Intent> {
            Ok(self.intent)
        }

        async fn evaluate(&self, _request: &EvaluateRequest) -> Result<EvaluationResult> {
            self.evaluations
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(evaluation(7)))
        }

        async fn generate_question(&self, _request: &GenerateRequest) -> Result<String> {
            self.generated.clone()
        }

        async fn generate_follow_up(&self, _request: &FollowUpRequest) -> Result<Option<String>> {
            Ok(None)
        }

        async fn respond_to_meta(&self, _request: &MetaRequest) -> Result<String> {
            self.meta.clone()
        }
    }

    fn bank_question(id: &str, difficulty: u8) -> Question {
        Question {
            id: id.to_string(),
            text: format!("{id} text"),
            topic: "programming".to_string(),
            difficulty,
            expected_answer: None,
            follow_ups: vec![],
            source: QuestionSource::Bank,
        }
    }

    fn orchestrator(
        reasoning: ScriptedReasoning,
        questions: Vec<Question>,
        policy: EnginePolicy,
    ) -> SessionOrchestrator {
        SessionOrchestrator::new(
            vec!["programming".to_string()],
            3,
            1800,
            Arc::new(QuestionBank::new(questions).unwrap()),
            Arc::new(reasoning),
            policy,
        )
        .unwrap()
    }

    fn asked_text(action: &EngineAction) -> String {
        match action {
            EngineAction::Ask { text, .. } => text.clone(),
            EngineAction::End(_) => panic!("expected a prompt, session ended"),
        }
    }

    #[tokio::test]
    async fn start_issues_the_first_question() {
        let mut orch = orchestrator(
            ScriptedReasoning::answering(vec![]),
            vec![bank_question("q1", 3)],
            EnginePolicy::default(),
        );
        let action = orch.start().await.unwrap();
        assert_eq!(asked_text(&action), "q1 text");
        assert_eq!(orch.session().phase, SessionPhase::Active);
    }

    #[tokio::test]
    async fn rejects_invalid_parameters() {
        let bank = Arc::new(QuestionBank::new(vec![]).unwrap());
        let reasoning: Arc<dyn ReasoningService> =
            Arc::new(ScriptedReasoning::answering(vec![]));
        let result = SessionOrchestrator::new(
            vec![],
            3,
            600,
            bank.clone(),
            reasoning.clone(),
            EnginePolicy::default(),
        );
        assert!(matches!(result, Err(InterviewError::MalformedMessage(_))));

        let result = SessionOrchestrator::new(
            vec!["programming".to_string()],
            6,
            600,
            bank,
            reasoning,
            EnginePolicy::default(),
        );
        assert!(matches!(result, Err(InterviewError::MalformedMessage(_))));
    }

    #[tokio::test]
    async fn strong_answers_advance_without_repeating_questions() {
        let mut orch = orchestrator(
            ScriptedReasoning::answering(vec![Ok(evaluation(9)), Ok(evaluation(9))]),
            vec![bank_question("q1", 3), bank_question("q2", 3)],
            EnginePolicy::default(),
        );
        let first = asked_text(&orch.start().await.unwrap());
        let second = asked_text(&orch.handle_transcript("a thorough answer").await.unwrap());
        assert_ne!(first, second);
        assert_eq!(orch.session().asked_ids().len(), 2);
    }

    #[tokio::test]
    async fn weak_answer_triggers_a_follow_up() {
        let mut orch = orchestrator(
            ScriptedReasoning::answering(vec![Ok(evaluation(5))]),
            vec![bank_question("q1", 3)],
            EnginePolicy::default(),
        );
        orch.start().await.unwrap();
        let action = orch.handle_transcript("a vague answer").await.unwrap();
        assert!(matches!(
            action,
            EngineAction::Ask { kind: ActionKind::FollowUp, .. }
        ));
        assert_eq!(orch.session().follow_up_count, 1);
        // the follow-up probe is recorded as the next exchange's prompt
        let next = orch.handle_transcript("a better answer").await;
        assert!(next.is_ok());
        assert!(orch.session().exchanges[1].is_follow_up);
    }

    #[tokio::test]
    async fn follow_up_counter_resets_on_new_question() {
        let mut orch = orchestrator(
            ScriptedReasoning::answering(vec![Ok(evaluation(5)), Ok(evaluation(9))]),
            vec![bank_question("q1", 3), bank_question("q2", 3)],
            EnginePolicy::default(),
        );
        orch.start().await.unwrap();
        orch.handle_transcript("a vague answer").await.unwrap();
        assert_eq!(orch.session().follow_up_count, 1);
        let action = orch.handle_transcript("a strong answer").await.unwrap();
        assert!(matches!(
            action,
            EngineAction::Ask { kind: ActionKind::Question, .. }
        ));
        assert_eq!(orch.session().follow_up_count, 0);
    }

    #[tokio::test]
    async fn meta_intent_gets_guidance_without_advancing() {
        let mut orch = orchestrator(
            ScriptedReasoning::answering(vec![]).with_intent(Intent::SeekingClarification),
            vec![bank_question("q1", 3)],
            EnginePolicy::default(),
        );
        orch.start().await.unwrap();
        let action = orch.handle_transcript("what do you mean by that?").await.unwrap();
        assert!(matches!(
            action,
            EngineAction::Ask { kind: ActionKind::Guidance, .. }
        ));
        // question thread unchanged, turn recorded without evaluation
        assert_eq!(orch.session().current_question.as_ref().unwrap().id, "q1");
        assert_eq!(orch.session().exchanges.len(), 1);
        assert!(orch.session().exchanges[0].evaluation.is_none());
        assert_eq!(orch.session().coverage.total_asked(), 1);
    }

    #[tokio::test]
    async fn meta_failure_falls_back_to_fixed_text() {
        let mut orch = orchestrator(
            ScriptedReasoning::answering(vec![])
                .with_intent(Intent::SeekingClarification)
                .with_meta(Err(service_err())),
            vec![bank_question("q1", 3)],
            EnginePolicy::default(),
        );
        orch.start().await.unwrap();
        let action = orch.handle_transcript("could you clarify?").await.unwrap();
        assert_eq!(
            asked_text(&action),
            "Let me repeat the question: q1 text"
        );
    }

    #[tokio::test]
    async fn single_evaluation_failure_prompts_a_retry() {
        let mut orch = orchestrator(
            ScriptedReasoning::answering(vec![Err(service_err()), Ok(evaluation(9))]),
            vec![bank_question("q1", 3), bank_question("q2", 3)],
            EnginePolicy::default(),
        );
        orch.start().await.unwrap();
        let action = orch.handle_transcript("my answer").await.unwrap();
        assert_eq!(asked_text(&action), RETRY_PROMPT);
        // nothing was recorded for the failed turn
        assert!(orch.session().exchanges.is_empty());

        // the retry succeeds and the interview continues
        let action = orch.handle_transcript("my answer again").await.unwrap();
        assert!(matches!(action, EngineAction::Ask { kind: ActionKind::Question, .. }));
        assert_eq!(orch.session().exchanges.len(), 1);
    }

    #[tokio::test]
    async fn two_consecutive_failures_end_with_partial_summary() {
        let mut orch = orchestrator(
            ScriptedReasoning::answering(vec![
                Ok(evaluation(9)),
                Err(service_err()),
                Err(service_err()),
            ]),
            vec![bank_question("q1", 3), bank_question("q2", 3)],
            EnginePolicy::default(),
        );
        orch.start().await.unwrap();
        orch.handle_transcript("a good answer").await.unwrap();
        orch.handle_transcript("another answer").await.unwrap();
        let action = orch.handle_transcript("another answer").await.unwrap();
        let EngineAction::End(summary) = action else {
            panic!("expected the session to end");
        };
        // the earlier evaluated turn survives in the summary
        assert_eq!(summary.questions_evaluated, 1);
        assert_eq!(orch.session().phase, SessionPhase::Ended);

        let result = orch.handle_transcript("hello?").await;
        assert!(matches!(result, Err(InterviewError::InvalidSession { .. })));
    }

    #[tokio::test]
    async fn end_is_idempotent() {
        let mut orch = orchestrator(
            ScriptedReasoning::answering(vec![Ok(evaluation(8))]),
            vec![bank_question("q1", 3)],
            EnginePolicy::default(),
        );
        orch.start().await.unwrap();
        let first = orch.end();
        let second = orch.end();
        assert_eq!(first, second);
        assert_eq!(orch.session().phase, SessionPhase::Ended);
    }

    #[tokio::test]
    async fn exchange_limit_ends_the_session() {
        let policy = EnginePolicy {
            max_exchanges: Some(1),
            ..EnginePolicy::default()
        };
        let mut orch = orchestrator(
            ScriptedReasoning::answering(vec![Ok(evaluation(9))]),
            vec![bank_question("q1", 3), bank_question("q2", 3)],
            policy,
        );
        orch.start().await.unwrap();
        let action = orch.handle_transcript("an answer").await.unwrap();
        assert!(matches!(action, EngineAction::End(_)));
    }

    #[tokio::test]
    async fn exhausted_budget_ends_instead_of_evaluating() {
        let mut orch = SessionOrchestrator::new(
            vec!["programming".to_string()],
            3,
            1,
            Arc::new(QuestionBank::new(vec![bank_question("q1", 3), bank_question("q2", 3)]).unwrap()),
            Arc::new(ScriptedReasoning::answering(vec![Ok(evaluation(9))])),
            EnginePolicy::default(),
        )
        .unwrap();
        orch.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        let action = orch.handle_transcript("a late answer").await.unwrap();
        let EngineAction::End(summary) = action else {
            panic!("expected the session to end on exhaustion");
        };
        // the late answer is discarded, not evaluated
        assert_eq!(summary.questions_evaluated, 0);
        assert_eq!(orch.session().phase, SessionPhase::Ended);
    }

    #[tokio::test]
    async fn exhausted_budget_preempts_non_answer_turns() {
        let mut orch = SessionOrchestrator::new(
            vec!["programming".to_string()],
            3,
            1,
            Arc::new(QuestionBank::new(vec![bank_question("q1", 3)]).unwrap()),
            Arc::new(
                ScriptedReasoning::answering(vec![]).with_intent(Intent::SeekingClarification),
            ),
            EnginePolicy::default(),
        )
        .unwrap();
        orch.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        let action = orch.handle_transcript("could you clarify?").await.unwrap();
        assert!(matches!(action, EngineAction::End(_)));
        assert_eq!(orch.session().phase, SessionPhase::Ended);
    }

    #[tokio::test]
    async fn selection_exhaustion_ends_the_session() {
        // empty bank and failing generation: the first advance closes
        let mut orch = orchestrator(
            ScriptedReasoning::answering(vec![]).without_generation(),
            vec![],
            EnginePolicy::default(),
        );
        let action = orch.start().await.unwrap();
        assert!(matches!(action, EngineAction::End(_)));
        assert_eq!(orch.session().phase, SessionPhase::Ended);
    }

    #[tokio::test]
    async fn empty_transcript_asks_again() {
        let mut orch = orchestrator(
            ScriptedReasoning::answering(vec![]),
            vec![bank_question("q1", 3)],
            EnginePolicy::default(),
        );
        orch.start().await.unwrap();
        let action = orch.handle_transcript("   ").await.unwrap();
        assert_eq!(asked_text(&action), EMPTY_TRANSCRIPT_PROMPT);
        assert!(orch.session().exchanges.is_empty());
    }
}
