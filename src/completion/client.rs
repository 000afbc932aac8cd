use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::completion::CompletionError;
use crate::config::Config;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pulls the first choice's text out of a raw chat-completions body.
pub fn parse_choice_text(body: &str) -> Result<String, CompletionError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| CompletionError::MalformedResponse("no choices in response".to_string()))
}

/// One attempt against a completion provider, no retries.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

pub struct OpenAiBackend {
    client: Client,
    url: String,
    api_key: String,
}

impl OpenAiBackend {
    pub fn new(cfg: &Config) -> Result<Self, CompletionError> {
        if cfg.completion_api_key.is_empty() {
            return Err(CompletionError::MissingApiKey);
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: cfg.completion_url.clone(),
            api_key: cfg.completion_api_key.clone(),
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        match status {
            StatusCode::UNAUTHORIZED => return Err(CompletionError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => return Err(CompletionError::RateLimited),
            s if !s.is_success() => {
                let body = resp.text().await.unwrap_or_default();
                return Err(CompletionError::Api {
                    status: s.as_u16(),
                    body,
                });
            }
            _ => {}
        }

        let body = resp.text().await?;
        parse_choice_text(&body)
    }
}

/// Wraps a backend with exponential backoff on rate limiting.
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
    model: String,
    max_retries: u32,
    base_delay: Duration,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, cfg: &Config) -> Self {
        Self {
            backend,
            model: cfg.completion_model.clone(),
            max_retries: cfg.max_retries,
            base_delay: cfg.retry_base_delay(),
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, CompletionError> {
        let backend = OpenAiBackend::new(cfg)?;
        Ok(Self::new(Arc::new(backend), cfg))
    }

    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    pub fn request(&self, messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Delay before retry number `retry` (0-based): base, 2*base, 4*base, ...
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry)
    }

    pub async fn complete(&self, messages: Vec<Message>) -> Result<String, CompletionError> {
        let request = self.request(messages);
        let mut retry = 0;

        loop {
            match self.backend.complete(&request).await {
                Ok(text) => return Ok(text),
                Err(CompletionError::RateLimited) => {
                    if retry >= self.max_retries {
                        warn!("Completion rate limited, giving up after {} attempts", retry + 1);
                        return Err(CompletionError::MaxRetries {
                            attempts: retry + 1,
                        });
                    }
                    let delay = self.backoff_delay(retry);
                    debug!(
                        "Completion rate limited, retry {}/{} in {:?}",
                        retry + 1,
                        self.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
