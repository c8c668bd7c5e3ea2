//! Wire message contracts for clients of the engine.
//!
//! Transport-agnostic: a WebSocket gateway, a CLI, or a test harness can
//! all speak these shapes. Tagged serialization keeps the protocol
//! self-describing.

use intervox_core::session::SessionSummary;
use serde::{Deserialize, Serialize};

/// Client-to-engine messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Begin a new interview session.
    StartSession {
        topics: Vec<String>,
        /// Starting difficulty, 1-5.
        difficulty: u8,
        duration_minutes: u64,
    },
    /// A completed utterance, already transcribed by the client.
    SubmitTranscript {
        session_id: String,
        transcript: String,
    },
    /// A completed utterance as raw audio, to be transcribed server-side.
    SubmitAudio {
        session_id: String,
        audio_base64: String,
    },
    /// End the session early and fetch the summary.
    EndSession { session_id: String },
    /// Which topics and difficulty levels the question bank offers.
    GetTopics,
}

/// What kind of prompt the engine is posing next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// A fresh question on a new thread.
    Question,
    /// A probe deeper into the current question thread.
    FollowUp,
    /// A clarification, hint, retry prompt, or answer to a candidate
    /// question. Does not advance the question thread.
    Guidance,
}

/// One prompt for the candidate, optionally with synthesized speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    pub kind: ActionKind,
    pub text: String,
    pub remaining_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
}

/// Engine-to-client messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    SessionStarted {
        session_id: String,
        action: ActionPayload,
    },
    NextAction {
        session_id: String,
        action: ActionPayload,
    },
    SessionEnded {
        session_id: String,
        summary: SessionSummary,
    },
    Topics {
        topics: Vec<String>,
        difficulty_range: (u8, u8),
    },
    Error {
        message: String,
        retryable: bool,
    },
}
