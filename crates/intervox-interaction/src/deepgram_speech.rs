//! DeepgramSpeech - Speech Service over the Deepgram listen/speak APIs.

use async_trait::async_trait;
use intervox_core::error::{InterviewError, Result, ServiceKind};
use intervox_core::speech::SpeechService;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::time::Duration;
use tracing::debug;

const LISTEN_URL: &str = "https://api.deepgram.com/v1/listen";
const SPEAK_URL: &str = "https://api.deepgram.com/v1/speak";
const DEFAULT_STT_MODEL: &str = "nova-2";
const DEFAULT_TTS_MODEL: &str = "aura-asteria-en";

/// Speech Service implementation backed by the Deepgram HTTP API.
#[derive(Clone)]
pub struct DeepgramSpeech {
    client: Client,
    api_key: String,
    stt_model: String,
    tts_model: String,
    timeout: Duration,
}

impl DeepgramSpeech {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            stt_model: DEFAULT_STT_MODEL.into(),
            tts_model: DEFAULT_TTS_MODEL.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Loads the API key from `DEEPGRAM_API_KEY`.
    pub fn try_from_env() -> Result<Self> {
        let api_key = env::var("DEEPGRAM_API_KEY").map_err(|_| {
            InterviewError::config("DEEPGRAM_API_KEY not found in environment variables")
        })?;
        Ok(Self::new(api_key))
    }

    pub fn with_stt_model(mut self, model: impl Into<String>) -> Self {
        self.stt_model = model.into();
        self
    }

    pub fn with_tts_model(mut self, model: impl Into<String>) -> Self {
        self.tts_model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SpeechService for DeepgramSpeech {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let response = self
            .client
            .post(LISTEN_URL)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .query(&[
                ("model", self.stt_model.as_str()),
                ("smart_format", "true"),
                ("punctuate", "true"),
                ("language", "en-US"),
            ])
            .timeout(self.timeout)
            .body(audio.to_vec())
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Deepgram error body".to_string());
            return Err(map_http_error(status, body));
        }

        let parsed: ListenResponse = response.json().await.map_err(|err| {
            InterviewError::service_failure(
                ServiceKind::Speech,
                format!("Failed to parse Deepgram response: {err}"),
                false,
            )
        })?;

        let transcript = extract_transcript(&parsed)?;
        debug!(chars = transcript.len(), "audio transcribed");
        Ok(transcript)
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(SPEAK_URL)
            .header("Authorization", format!("Token {}", self.api_key))
            .query(&[("model", self.tts_model.as_str())])
            .timeout(self.timeout)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Deepgram error body".to_string());
            return Err(map_http_error(status, body));
        }

        let bytes = response.bytes().await.map_err(|err| {
            InterviewError::service_failure(
                ServiceKind::Speech,
                format!("Failed to read Deepgram audio: {err}"),
                false,
            )
        })?;
        Ok(bytes.to_vec())
    }
}

fn extract_transcript(response: &ListenResponse) -> Result<String> {
    let transcript = response
        .results
        .channels
        .first()
        .and_then(|channel| channel.alternatives.first())
        .map(|alt| alt.transcript.trim().to_string())
        .unwrap_or_default();
    if transcript.is_empty() {
        return Err(InterviewError::service_failure(
            ServiceKind::Speech,
            "no speech detected in audio",
            false,
        ));
    }
    Ok(transcript)
}

fn map_transport_error(err: reqwest::Error) -> InterviewError {
    InterviewError::service_failure(
        ServiceKind::Speech,
        format!("Deepgram request failed: {err}"),
        err.is_connect() || err.is_timeout(),
    )
}

fn map_http_error(status: StatusCode, body: String) -> InterviewError {
    let retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );
    InterviewError::service_failure(
        ServiceKind::Speech,
        format!("Deepgram returned {status}: {body}"),
        retryable,
    )
}

#[derive(Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Deserialize)]
struct ListenResults {
    channels: Vec<ListenChannel>,
}

#[derive(Deserialize)]
struct ListenChannel {
    alternatives: Vec<ListenAlternative>,
}

#[derive(Deserialize)]
struct ListenAlternative {
    transcript: String,
}
