use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::TranslationClient;
use crate::app_config::Config;
use crate::errors::NetworkError;
use crate::language_utils;
use crate::translation::planner::Batch;
use crate::translation::prompts::PromptBuilder;

/// Client for OpenAI-compatible chat completions endpoints
pub struct OpenAICompatible {
    /// HTTP client for API requests
    client: Client,
    /// Full URL of the chat completions endpoint
    endpoint: String,
    /// Model identifier sent with each request
    model: String,
    /// Optional bearer token
    api_key: String,
    /// Request timeout in seconds
    timeout_secs: u64,
    /// Prompt assembly
    prompts: PromptBuilder,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: Option<String>,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// The model to use
    pub model: String,
    /// The messages of the conversation
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Single user message request
    pub fn user(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.into()),
            }],
        }
    }
}

/// Individual completion choice
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The generated message
    pub message: ChatMessage,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Generated choices, the first one is used
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl std::fmt::Debug for OpenAICompatible {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAICompatible")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &if self.api_key.is_empty() { "<none>" } else { "<redacted>" })
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OpenAICompatible {
    /// Create a new client
    ///
    /// Fails when the HTTP client cannot be built, since a client without the
    /// configured timeout could wait forever.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
        prompts: PromptBuilder,
    ) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            // Keep connections alive for parallel batches
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(20)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                error!("Failed to build HTTP client: {}", e);
                NetworkError::Connection(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout_secs,
            prompts,
        })
    }

    /// Create a client from the application configuration
    pub fn from_config(config: &Config) -> Result<Self, NetworkError> {
        let prompts = PromptBuilder::new(
            config.prompt_template.clone(),
            language_utils::display_name(&config.source_language),
            language_utils::display_name(&config.target_language),
        );
        Self::new(
            config.backend.endpoint.clone(),
            config.backend.model.clone(),
            config.backend.api_key.clone(),
            config.backend.timeout_secs,
            prompts,
        )
    }

    /// Submit a prompt and return the reply text
    pub async fn complete(&self, prompt: &str) -> Result<String, NetworkError> {
        let request = ChatRequest::user(&self.model, prompt);

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Backend error ({}): {}", status, error_text);
            return Err(NetworkError::Status {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| NetworkError::InvalidBody(format!("{}: {}", e, excerpt(&body))))?;

        Self::extract_text(&parsed).ok_or_else(|| NetworkError::InvalidBody(format!("no message content: {}", excerpt(&body))))
    }

    /// Test the connection to the backend
    pub async fn test_connection(&self) -> Result<(), NetworkError> {
        self.complete("Hello").await.map(|_| ())
    }

    /// Text of the first choice, trimmed
    pub fn extract_text(response: &ChatResponse) -> Option<String> {
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(|text| text.trim().to_string())
    }

    fn classify(&self, error: reqwest::Error) -> NetworkError {
        if error.is_timeout() {
            NetworkError::Timeout(self.timeout_secs)
        } else {
            NetworkError::Connection(error.to_string())
        }
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(300).collect()
}

#[async_trait]
impl TranslationClient for OpenAICompatible {
    async fn translate(&self, batch: &Batch) -> Result<String, NetworkError> {
        let prompt = self.prompts.build(batch);
        let start_time = Instant::now();
        let reply = self.complete(&prompt).await;
        debug!(
            "Backend call for batch {} took {:?} ({} prompt chars)",
            batch.index + 1,
            start_time.elapsed(),
            prompt.chars().count()
        );
        reply
    }
}
