//! HTTP implementations of the external service boundaries.
//!
//! The core engine only sees the `ReasoningService` and `SpeechService`
//! traits; this crate backs them with the OpenAI chat-completions REST API
//! and the Deepgram listen/speak REST APIs respectively.

pub mod deepgram_speech;
pub mod openai_reasoning;

pub use deepgram_speech::DeepgramSpeech;
pub use openai_reasoning::OpenAiReasoning;
