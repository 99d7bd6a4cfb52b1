//! Text generation service boundary.
//!
//! The pipeline treats the language model as an opaque service: a rendered
//! prompt goes in, a lazy sequence of text chunks comes out. Callers
//! concatenate the chunks in delivery order with [`collect_text`] or
//! [`generate_text`] before parsing.
//!
//! [`GeminiClient`] is the production implementation; deterministic fakes
//! live in [`crate::fakes`].

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Lazy sequence of generated text fragments.
pub type TextStream = BoxStream<'static, Result<String, GenerationError>>;

/// Errors produced by a generation service.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response; `body` is the raw upstream payload.
    #[error("generation service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("generation stream failed: {0}")]
    Stream(String),

    #[error("no API key configured for model {model}")]
    MissingApiKey { model: String },
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Http(_) => "http",
            GenerationError::Upstream { .. } => "upstream",
            GenerationError::Stream(_) => "stream",
            GenerationError::MissingApiKey { .. } => "missing_api_key",
        }
    }
}

impl crate::tracer::ErrorKind for GenerationError {
    fn kind(&self) -> &'static str {
        GenerationError::kind(self)
    }
}

/// One generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    /// Standing instruction for the agent persona (system prompt).
    pub instruction: String,
    /// Rendered task prompt.
    pub prompt: String,
    /// Conversation/session the call belongs to, if any.
    pub session_id: Option<String>,
}

impl GenerationRequest {
    pub fn new(instruction: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            prompt: prompt.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Opaque text-generation collaborator.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Identifier of the backing model, recorded on every artifact.
    fn model_name(&self) -> &str;

    /// Start a generation and return its chunk stream.
    async fn stream(&self, request: GenerationRequest) -> Result<TextStream, GenerationError>;
}

/// Drain `stream`, concatenating chunks in delivery order.
pub async fn collect_text(mut stream: TextStream) -> Result<String, GenerationError> {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        text.push_str(&chunk?);
    }
    Ok(text)
}

/// Run one request to completion and return the full response text.
pub async fn generate_text(
    service: &dyn GenerationService,
    request: GenerationRequest,
) -> Result<String, GenerationError> {
    let stream = service.stream(request).await?;
    collect_text(stream).await
}

/// Sampling parameters for [`GeminiClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiSettings {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
    pub base_url: String,
}

impl GeminiSettings {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_output_tokens: 4000,
            timeout: Duration::from_secs(3600),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Google Gemini `generateContent` client.
///
/// Every text part of the first candidate becomes one chunk. A non-2xx
/// response surfaces as [`GenerationError::Upstream`] carrying the JSON
/// error body, so an overloaded backend (`503` / `UNAVAILABLE`) matches the
/// transient signature in [`crate::retry`].
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, settings: GeminiSettings) -> Result<Self, GenerationError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerationError::MissingApiKey {
                model: settings.model.clone(),
            })?;
        let client = reqwest::Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            api_key,
            settings,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    fn request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        json!({
            "systemInstruction": { "parts": [{ "text": request.instruction }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_output_tokens,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

/// Text parts of the first candidate, in order.
fn response_chunks(response: GeminiResponse) -> Vec<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default()
}

#[async_trait]
impl GenerationService for GeminiClient {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    async fn stream(&self, request: GenerationRequest) -> Result<TextStream, GenerationError> {
        debug!(
            model = %self.settings.model,
            session_id = ?request.session_id,
            prompt_chars = request.prompt.len(),
            "sending generation request"
        );
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Stream(e.to_string()))?;
        let chunks = response_chunks(parsed);
        Ok(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}
