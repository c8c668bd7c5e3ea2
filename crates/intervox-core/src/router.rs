//! Intent classification with a deliberate fail-open degradation policy.

use crate::reasoning::{ClassifyRequest, ReasoningService};
use crate::session::{Intent, Session};
use std::sync::Arc;
use tracing::warn;

/// Thin pass-through to the Reasoning Service classifier.
///
/// Adds no heuristics of its own beyond defaulting to `Answering` when the
/// boundary call fails, so the interview keeps moving instead of stalling.
pub struct IntentRouter {
    reasoning: Arc<dyn ReasoningService>,
}

impl IntentRouter {
    pub fn new(reasoning: Arc<dyn ReasoningService>) -> Self {
        Self { reasoning }
    }

    pub async fn classify(&self, transcript: &str, session: &Session) -> Intent {
        let request = ClassifyRequest {
            transcript: transcript.to_string(),
            current_question: session.current_question.as_ref().map(|q| q.text.clone()),
            awaiting_answer: session.current_question.is_some(),
            follow_ups_asked: session.follow_up_count,
        };
        match self.reasoning.classify(&request).await {
            Ok(intent) => intent,
            Err(err) => {
                warn!(session_id = %session.id, %err, "intent classification failed, defaulting to answering");
                Intent::Answering
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InterviewError, Result, ServiceKind};
    use crate::reasoning::{
        EvaluateRequest, FollowUpRequest, GenerateRequest, MetaRequest,
    };
    use crate::session::EvaluationResult;
    use async_trait::async_trait;
    use chrono::Utc;

    struct FixedReasoning {
        intent: Result<Intent>,
    }

    #[async_trait]
    impl ReasoningService for FixedReasoning {
        async fn classify(&self, _request: &ClassifyRequest) -> Result<Intent> {
            self.intent.clone()
        }

        async fn evaluate(&self, _request: &EvaluateRequest) -> Result<EvaluationResult> {
            unimplemented!()
        }

        async fn generate_question(&self, _request: &GenerateRequest) -> Result<String> {
            unimplemented!()
        }

        async fn generate_follow_up(&self, _request: &FollowUpRequest) -> Result<Option<String>> {
            unimplemented!()
        }

        async fn respond_to_meta(&self, _request: &MetaRequest) -> Result<String> {
            unimplemented!()
        }
    }

    fn session() -> Session {
        Session::new(vec!["programming".to_string()], 3, 600, Utc::now())
    }

    #[tokio::test]
    async fn passes_through_service_classification() {
        let router = IntentRouter::new(Arc::new(FixedReasoning {
            intent: Ok(Intent::SeekingClarification),
        }));
        let intent = router.classify("what do you mean?", &session()).await;
        assert_eq!(intent, Intent::SeekingClarification);
    }

    #[tokio::test]
    async fn fails_open_to_answering() {
        let router = IntentRouter::new(Arc::new(FixedReasoning {
            intent: Err(InterviewError::service_failure(
                ServiceKind::Reasoning,
                "timeout",
                true,
            )),
        }));
        let intent = router.classify("well, I think...", &session()).await;
        assert_eq!(intent, Intent::Answering);
    }
}
