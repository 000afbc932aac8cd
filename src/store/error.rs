use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is not configured (SUPABASE_URL / SUPABASE_ANON_KEY)")]
    NotConfigured,

    #[error("store rejected credentials ({0})")]
    Unauthorized(u16),

    #[error("store error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("store request failed: {0}")]
    Transport(String),

    #[error("unexpected {table} row shape: {reason}")]
    Decode { table: String, reason: String },

    #[error("invalid access token: {0}")]
    InvalidToken(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
