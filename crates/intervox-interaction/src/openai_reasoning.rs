//! OpenAiReasoning - Reasoning Service over the OpenAI Chat Completions API.
//!
//! All prompt text lives here; the engine depends only on the structured
//! request/response contracts in `intervox_core::reasoning`.

use async_trait::async_trait;
use intervox_core::error::{InterviewError, Result, ServiceKind};
use intervox_core::reasoning::{
    ClassifyRequest, EvaluateRequest, FollowUpRequest, GenerateRequest, MetaKind, MetaRequest,
    ReasoningService,
};
use intervox_core::session::{EvaluationResult, Intent};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

const EVALUATOR_SYSTEM_PROMPT: &str = "You are an expert technical interviewer evaluating candidate responses. \
Provide fair, constructive, and detailed feedback on interview answers.\n\
Evaluation criteria: accuracy, completeness, clarity, depth, examples.\n\
Scoring guidelines: 9-10 excellent, 7-8 good, 5-6 average, 3-4 below average, 1-2 poor.";

/// Reasoning Service implementation that talks to the OpenAI HTTP API.
#[derive(Clone)]
pub struct OpenAiReasoning {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiReasoning {
    /// Creates a new service with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 500,
            timeout: Duration::from_secs(10),
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// `OPENAI_API_KEY` is required; `OPENAI_MODEL_NAME` defaults to
    /// `gpt-4o-mini`.
    pub fn try_from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            InterviewError::config("OPENAI_API_KEY not found in environment variables")
        })?;
        let model = env::var("OPENAI_MODEL_NAME").unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.into());
        Ok(Self::new(api_key, model))
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the bounded per-call timeout (default 10s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn complete(&self, system: Option<&str>, user: String) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: user,
        });

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(BASE_URL)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                InterviewError::service_failure(
                    ServiceKind::Reasoning,
                    format!("OpenAI request failed: {err}"),
                    err.is_connect() || err.is_timeout(),
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(map_http_error(status, body));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            InterviewError::service_failure(
                ServiceKind::Reasoning,
                format!("Failed to parse OpenAI response: {err}"),
                false,
            )
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                InterviewError::service_failure(
                    ServiceKind::Reasoning,
                    "OpenAI returned no choices",
                    false,
                )
            })
    }
}

#[async_trait]
impl ReasoningService for OpenAiReasoning {
    async fn classify(&self, request: &ClassifyRequest) -> Result<Intent> {
        let prompt = format!(
            "Analyze this user speech in a technical interview context.\n\n\
             Current State:\n\
             - Current Question: \"{}\"\n\
             - Awaiting Answer: {}\n\
             - Follow-ups Asked: {}\n\n\
             User Said: \"{}\"\n\n\
             Determine the user's intent. Choose ONE:\n\
             - \"answering_question\": providing an answer to the current question\n\
             - \"asking_question\": asking the interviewer a question\n\
             - \"seeking_clarification\": wants the current question clarified or repeated\n\
             - \"confused_or_stuck\": confused, stuck, or needs help\n\n\
             Return ONLY the intent category.",
            request.current_question.as_deref().unwrap_or("None"),
            request.awaiting_answer,
            request.follow_ups_asked,
            request.transcript,
        );
        let label = self.complete(None, prompt).await?;
        let intent = parse_intent_label(&label);
        debug!(%label, ?intent, "classified transcript");
        Ok(intent)
    }

    async fn evaluate(&self, request: &EvaluateRequest) -> Result<EvaluationResult> {
        let prompt = format!(
            "Please evaluate the following interview answer.\n\n\
             **Question:** {}\n\n\
             **Expected Answer:** {}\n\n\
             **Candidate's Answer:** {}\n\n\
             **Question Topic:** {}\n\
             **Question Difficulty:** {}/5\n\n\
             Provide your evaluation in the following JSON format:\n\
             {{\n\
               \"score\": <integer from 1-10>,\n\
               \"feedback\": \"<detailed feedback on accuracy and completeness>\",\n\
               \"suggestions\": \"<specific improvement suggestions>\",\n\
               \"follow_up\": \"<optional follow-up question, or null>\",\n\
               \"strengths\": [\"<strength1>\"],\n\
               \"weaknesses\": [\"<weakness1>\"],\n\
               \"complete\": <true if the answer fully covered the question>\n\
             }}\n\n\
             Ensure your response is valid JSON.",
            request.question,
            request.expected_answer.as_deref().unwrap_or(""),
            request.answer,
            request.topic,
            request.difficulty,
        );
        let body = self.complete(Some(EVALUATOR_SYSTEM_PROMPT), prompt).await?;
        let evaluation = parse_evaluation(&body, &request.answer);
        info!(score = evaluation.score, "answer evaluated");
        Ok(evaluation)
    }

    async fn generate_question(&self, request: &GenerateRequest) -> Result<String> {
        let opening = if request.first_question {
            "Generate the opening question for a technical interview. Set a welcoming tone."
        } else {
            "Generate the next question for this technical interview. Cover new ground not yet explored."
        };
        let topics = request.topics.join(" and ");
        let prompt = format!(
            "{opening}\n\n\
             Context:\n\
             - Topics: {topics}\n\
             - Difficulty: {}/5\n\
             - Remaining interview time: {} seconds\n\
             - Questions already asked: {:?}\n\
             - Recent answers: {:?}\n\n\
             Create a question that:\n\
             - Covers the given topic{}\n\
             - Can be answered comfortably within the remaining time\n\
             - Builds naturally on the conversation\n\n\
             Return just the question text.",
            request.difficulty,
            request.remaining_seconds,
            request.prior_questions,
            request.prior_answers,
            if request.topics.len() > 1 {
                "s, connecting them in a single question"
            } else {
                ""
            },
        );
        let text = self.complete(None, prompt).await?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(InterviewError::service_failure(
                ServiceKind::Reasoning,
                "question generation returned empty text",
                false,
            ));
        }
        Ok(text)
    }

    async fn generate_follow_up(&self, request: &FollowUpRequest) -> Result<Option<String>> {
        let prompt = format!(
            "Based on the following interview exchange, generate a relevant follow-up question that \
             probes deeper into the topic, tests practical application, and clarifies unclear points. \
             Topic: {}\n\n\
             Original Question: {}\n\
             Candidate's Answer: {}\n\
             Evaluation Feedback: {}\n\n\
             Generate only the follow-up question, no additional text.",
            request.topic, request.question, request.answer, request.feedback,
        );
        let text = self.complete(None, prompt).await?;
        let text = text.trim();
        if text.len() > 10 {
            Ok(Some(text.to_string()))
        } else {
            Ok(None)
        }
    }

    async fn respond_to_meta(&self, request: &MetaRequest) -> Result<String> {
        let instructions = match request.kind {
            MetaKind::CandidateQuestion => {
                "The candidate asked the interviewer a question. Answer it appropriately without \
                 giving away answers, keep a professional interview tone, and smoothly transition \
                 back to the interview. Keep it to 2-3 sentences."
            }
            MetaKind::Clarification => {
                "The candidate asked for clarification about the current question. Rephrase or \
                 explain the question differently, give helpful context without revealing the \
                 answer, and encourage them to attempt an answer. Keep it concise and supportive."
            }
            MetaKind::Encouragement => {
                "The candidate seems confused or stuck. Acknowledge their difficulty, offer a \
                 helpful hint or different approach, and encourage them without giving away the \
                 answer. Be empathetic and constructive."
            }
        };
        let prompt = format!(
            "You are an experienced technical interviewer.\n\n\
             {instructions}\n\n\
             Current Question: {}\n\
             Interview Topics: {:?}\n\
             Time Remaining: {} seconds\n\n\
             They said: \"{}\"",
            request.current_question.as_deref().unwrap_or("Starting interview"),
            request.topics,
            request.remaining_seconds,
            request.transcript,
        );
        let text = self.complete(None, prompt).await?;
        Ok(text.trim().to_string())
    }
}

/// Maps a free-text intent label onto the fixed intent set: exact labels
/// parse directly, chatty replies fall back to substring matching, and
/// anything unrecognized defaults to `Answering`.
fn parse_intent_label(label: &str) -> Intent {
    let label = label.trim().to_lowercase();
    if let Ok(intent) = Intent::from_str(&label) {
        return intent;
    }
    if label.contains("asking") {
        Intent::AskingQuestion
    } else if label.contains("clarification") {
        Intent::SeekingClarification
    } else if label.contains("confused") || label.contains("stuck") {
        Intent::ConfusedOrStuck
    } else {
        Intent::Answering
    }
}

/// Parses the evaluator's JSON reply, tolerating markdown code fences.
/// Falls back to a rough length-based evaluation when the reply is not
/// valid JSON, so a chatty model never stalls the interview.
fn parse_evaluation(body: &str, answer: &str) -> EvaluationResult {
    let json = extract_json(body);
    match serde_json::from_str::<EvaluationResult>(json) {
        Ok(mut evaluation) => {
            evaluation.score = evaluation.score.clamp(1, 10);
            evaluation
        }
        Err(err) => {
            tracing::warn!(%err, "evaluation reply was not valid JSON, using fallback scoring");
            fallback_evaluation(answer, body)
        }
    }
}

fn fallback_evaluation(answer: &str, body: &str) -> EvaluationResult {
    let score = (answer.split_whitespace().count() / 5).clamp(1, 10) as u8;
    let mut feedback = format!("Evaluation completed. {body}");
    feedback.truncate(200);
    EvaluationResult {
        score,
        feedback,
        suggestions: "Please provide more detailed explanations and examples.".to_string(),
        strengths: vec!["Provided an answer".to_string()],
        weaknesses: vec!["Could be more detailed".to_string()],
        follow_up: None,
        complete: false,
    }
}

/// Strips markdown code fences from around a JSON payload.
fn extract_json(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim().strip_suffix("```").unwrap_or(rest).trim()
}

fn map_http_error(status: StatusCode, body: String) -> InterviewError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);
    let retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );
    InterviewError::service_failure(
        ServiceKind::Reasoning,
        format!("OpenAI returned {status}: {message}"),
        retryable,
    )
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
