//! Session registry: the engine's multi-session front door.
//!
//! Holds every live session behind a per-session lock so turns stay
//! strictly sequential, and maps inbound wire messages to orchestrator
//! operations.

use crate::message::{ActionKind, ActionPayload, InboundMessage, OutboundMessage};
use crate::orchestrator::{EngineAction, SessionOrchestrator};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use intervox_core::config::EnginePolicy;
use intervox_core::error::InterviewError;
use intervox_core::question::QuestionBank;
use intervox_core::reasoning::ReasoningService;
use intervox_core::speech::SpeechService;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

struct SessionEntry {
    orchestrator: Mutex<SessionOrchestrator>,
    cancel: CancellationToken,
}

/// Manages multiple concurrent interview sessions.
///
/// Each session's turns are serialized through its own async mutex;
/// different sessions proceed independently. Ending a session cancels any
/// in-flight turn on it, discarding that turn's work.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
    bank: Arc<QuestionBank>,
    reasoning: Arc<dyn ReasoningService>,
    speech: Option<Arc<dyn SpeechService>>,
    policy: EnginePolicy,
}

impl SessionRegistry {
    pub fn new(
        bank: Arc<QuestionBank>,
        reasoning: Arc<dyn ReasoningService>,
        policy: EnginePolicy,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            bank,
            reasoning,
            speech: None,
            policy,
        }
    }

    /// Attaches a Speech Service, enabling the audio submission path and
    /// spoken prompts.
    pub fn with_speech(mut self, speech: Arc<dyn SpeechService>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Routes one inbound message to the owning session and returns the
    /// reply. Never panics and never returns an error type; every failure
    /// becomes an `OutboundMessage::Error`.
    pub async fn dispatch(&self, message: InboundMessage) -> OutboundMessage {
        match message {
            InboundMessage::StartSession {
                topics,
                difficulty,
                duration_minutes,
            } => self.start_session(topics, difficulty, duration_minutes).await,
            InboundMessage::SubmitTranscript {
                session_id,
                transcript,
            } => self.submit_transcript(&session_id, &transcript).await,
            InboundMessage::SubmitAudio {
                session_id,
                audio_base64,
            } => self.submit_audio(&session_id, &audio_base64).await,
            InboundMessage::EndSession { session_id } => self.end_session(&session_id).await,
            InboundMessage::GetTopics => OutboundMessage::Topics {
                topics: self.bank.topics(),
                difficulty_range: self.bank.difficulty_range(),
            },
        }
    }

    async fn start_session(
        &self,
        topics: Vec<String>,
        difficulty: u8,
        duration_minutes: u64,
    ) -> OutboundMessage {
        let mut orchestrator = match SessionOrchestrator::new(
            topics,
            difficulty,
            duration_minutes.saturating_mul(60),
            self.bank.clone(),
            self.reasoning.clone(),
            self.policy.clone(),
        ) {
            Ok(orchestrator) => orchestrator,
            Err(err) => return error_reply(err),
        };
        let session_id = orchestrator.id().to_string();

        match orchestrator.start().await {
            Ok(EngineAction::Ask {
                kind,
                text,
                remaining_seconds,
            }) => {
                let action = self.payload(kind, text, remaining_seconds).await;
                let entry = Arc::new(SessionEntry {
                    orchestrator: Mutex::new(orchestrator),
                    cancel: CancellationToken::new(),
                });
                self.sessions
                    .write()
                    .await
                    .insert(session_id.clone(), entry);
                info!(%session_id, "session registered");
                OutboundMessage::SessionStarted { session_id, action }
            }
            // nothing askable at all; the session never registers
            Ok(EngineAction::End(summary)) => OutboundMessage::SessionEnded {
                session_id,
                summary,
            },
            Err(err) => error_reply(err),
        }
    }

    async fn submit_transcript(&self, session_id: &str, transcript: &str) -> OutboundMessage {
        let Some(entry) = self.entry(session_id).await else {
            return error_reply(InterviewError::invalid_session(session_id));
        };

        // An end request cancels the token; dropping the in-flight branch
        // releases the session lock and discards the partial turn.
        let result = tokio::select! {
            _ = entry.cancel.cancelled() => {
                return error_reply(InterviewError::invalid_session(session_id));
            }
            result = async {
                let mut orchestrator = entry.orchestrator.lock().await;
                orchestrator.handle_transcript(transcript).await
            } => result,
        };

        match result {
            Ok(EngineAction::Ask {
                kind,
                text,
                remaining_seconds,
            }) => OutboundMessage::NextAction {
                session_id: session_id.to_string(),
                action: self.payload(kind, text, remaining_seconds).await,
            },
            Ok(EngineAction::End(summary)) => OutboundMessage::SessionEnded {
                session_id: session_id.to_string(),
                summary,
            },
            Err(err) => error_reply(err),
        }
    }

    async fn submit_audio(&self, session_id: &str, audio_base64: &str) -> OutboundMessage {
        let Some(speech) = &self.speech else {
            return error_reply(InterviewError::config(
                "no speech service configured; submit transcripts instead",
            ));
        };
        let audio = match BASE64_STANDARD.decode(audio_base64) {
            Ok(audio) => audio,
            Err(err) => {
                return error_reply(InterviewError::malformed(format!(
                    "audio payload is not valid base64: {err}"
                )));
            }
        };
        let transcript = match speech.transcribe(&audio).await {
            Ok(transcript) => transcript,
            Err(err) => return error_reply(err),
        };
        self.submit_transcript(session_id, &transcript).await
    }

    async fn end_session(&self, session_id: &str) -> OutboundMessage {
        let Some(entry) = self.entry(session_id).await else {
            return error_reply(InterviewError::invalid_session(session_id));
        };
        entry.cancel.cancel();
        let summary = entry.orchestrator.lock().await.end();
        OutboundMessage::SessionEnded {
            session_id: session_id.to_string(),
            summary,
        }
    }

    async fn entry(&self, session_id: &str) -> Option<Arc<SessionEntry>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Builds the prompt payload, attaching synthesized speech best-effort.
    async fn payload(&self, kind: ActionKind, text: String, remaining_seconds: u64) -> ActionPayload {
        let audio_base64 = match &self.speech {
            Some(speech) => match speech.synthesize(&text).await {
                Ok(audio) => Some(BASE64_STANDARD.encode(audio)),
                Err(err) => {
                    warn!(%err, "speech synthesis failed, sending text only");
                    None
                }
            },
            None => None,
        };
        ActionPayload {
            kind,
            text,
            remaining_seconds,
            audio_base64,
        }
    }
}

fn error_reply(err: InterviewError) -> OutboundMessage {
    OutboundMessage::Error {
        message: err.to_string(),
        retryable: err.is_retryable(),
    }
}
