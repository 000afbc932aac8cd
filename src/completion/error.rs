use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("completion API key is not configured")]
    MissingApiKey,

    #[error("completion API rejected the API key (401); check configuration")]
    Unauthorized,

    #[error("completion API rate limit hit (429)")]
    RateLimited,

    #[error("completion API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("completion request failed: {0}")]
    Transport(String),

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("max retries exceeded after {attempts} attempts")]
    MaxRetries { attempts: u32 },

    #[error("completion queue is closed")]
    QueueClosed,
}

impl CompletionError {
    /// Configuration problems are surfaced immediately and never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CompletionError::MissingApiKey | CompletionError::Unauthorized)
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        CompletionError::Transport(e.to_string())
    }
}
