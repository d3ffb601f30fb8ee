//! OpenAI chat-completions feature extractor
//!
//! Sends one request per application with the `save_features` tool forced,
//! then decodes the tool call arguments.

use crate::models::{Application, Features};
use crate::services::prompt::{
    build_user_message, save_features_tool, SAVE_FEATURES_FUNCTION, SYSTEM_PROMPT,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Feature extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Response contained no {0} call")]
    MissingToolCall(&'static str),

    #[error("Malformed function arguments: {0}")]
    MalformedArguments(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// External reasoning capability turning application text into features
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    async fn extract(&self, application: &Application) -> Result<Features, ExtractionError>;
}

/// Configuration for the OpenAI extractor
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Base URL for API (default: https://api.openai.com/v1)
    pub base_url: String,
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: OPENAI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
    tools: Vec<Value>,
    tool_choice: Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

pub struct OpenAiExtractor {
    config: OpenAiConfig,
    http_client: reqwest::Client,
}

impl OpenAiExtractor {
    pub fn new(config: OpenAiConfig) -> Result<Self, ExtractionError> {
        if config.api_key.trim().is_empty() {
            return Err(ExtractionError::Config(
                "OpenAI API key is required".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::NetworkError(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_request(&self, application: &Application) -> ChatCompletionRequest<'_> {
        ChatCompletionRequest {
            model: &self.config.model,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_user_message(application),
                },
            ],
            tools: vec![save_features_tool()],
            tool_choice: json!({
                "type": "function",
                "function": {"name": SAVE_FEATURES_FUNCTION}
            }),
        }
    }
}

#[async_trait]
impl FeatureExtractor for OpenAiExtractor {
    async fn extract(&self, application: &Application) -> Result<Features, ExtractionError> {
        let request = self.build_request(application);
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        tracing::debug!(
            ref_id = %application.ref_id(),
            model = %self.config.model,
            "Requesting feature extraction"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 401 {
            return Err(ExtractionError::InvalidApiKey);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractionError::ApiError(status.as_u16(), error_text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::ParseError(e.to_string()))?;

        parse_features(completion)
    }
}

/// Pull the `save_features` arguments out of a completion
///
/// A call to any other function is ignored; when several `save_features`
/// calls are present the first one wins.
fn parse_features(completion: ChatCompletionResponse) -> Result<Features, ExtractionError> {
    let arguments = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.tool_calls)
        .and_then(|calls| {
            calls
                .into_iter()
                .find(|call| call.function.name == SAVE_FEATURES_FUNCTION)
        })
        .map(|call| call.function.arguments)
        .ok_or(ExtractionError::MissingToolCall(SAVE_FEATURES_FUNCTION))?;

    serde_json::from_str(&arguments).map_err(|e| ExtractionError::MalformedArguments(e.to_string()))
}
