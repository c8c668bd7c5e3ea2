//! The Speech Service boundary.

use crate::error::Result;
use async_trait::async_trait;

/// Speech-to-text and text-to-speech conversion, treated as an external
/// collaborator with a bounded timeout.
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Transcribes recorded audio into text.
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;

    /// Synthesizes spoken audio for a prompt.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}
