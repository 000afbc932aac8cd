use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Market data provider A (time-series history)
    pub history_api_key: String,
    pub history_base_url: String,

    // Market data provider B (snapshots + streaming)
    pub polygon_api_key: String,
    pub polygon_base_url: String,
    pub polygon_stream_url: String,

    // Text completion
    pub completion_api_key: String,
    pub completion_url: String,
    pub completion_model: String,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub queue_delay_ms: u64,

    // Managed store
    pub store_url: String,
    pub store_anon_key: String,

    // Analysis
    pub simulation_iterations: usize,

    // Request de-duplication
    pub cache_ttl_secs: u64,

    // Logging
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        Config {
            history_api_key: env("HISTORY_API_KEY", ""),
            history_base_url: env(
                "HISTORY_BASE_URL",
                "https://financialmodelingprep.com/api/v3",
            ),
            polygon_api_key: env("POLYGON_API_KEY", ""),
            polygon_base_url: env("POLYGON_BASE_URL", "https://api.polygon.io"),
            polygon_stream_url: env("POLYGON_STREAM_URL", "wss://socket.polygon.io/stocks"),
            completion_api_key: env("OPENAI_API_KEY", ""),
            completion_url: env(
                "COMPLETION_URL",
                "https://api.openai.com/v1/chat/completions",
            ),
            completion_model: env("COMPLETION_MODEL", "gpt-4o-mini"),
            max_retries: env("COMPLETION_MAX_RETRIES", "3").parse().unwrap_or(3),
            retry_base_delay_ms: env("COMPLETION_RETRY_BASE_MS", "2000")
                .parse()
                .unwrap_or(2000),
            queue_delay_ms: env("COMPLETION_QUEUE_DELAY_MS", "2000")
                .parse()
                .unwrap_or(2000),
            store_url: env("SUPABASE_URL", "").trim_end_matches('/').to_string(),
            store_anon_key: env("SUPABASE_ANON_KEY", ""),
            simulation_iterations: env("SIMULATION_ITERATIONS", "1000")
                .parse()
                .unwrap_or(1000),
            cache_ttl_secs: env("MARKET_CACHE_TTL_SECS", "60").parse().unwrap_or(60),
            log_level: env("LOG_LEVEL", "info"),
        }
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn queue_delay(&self) -> Duration {
        Duration::from_millis(self.queue_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn has_completion(&self) -> bool {
        !self.completion_api_key.is_empty()
    }

    pub fn has_store(&self) -> bool {
        !self.store_url.is_empty() && !self.store_anon_key.is_empty()
    }
}
