use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Hourly,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "daily",
            Interval::Hourly => "hourly",
        }
    }

    pub fn as_duration(&self) -> Duration {
        match self {
            Interval::Daily => Duration::from_secs(86400),
            Interval::Hourly => Duration::from_secs(3600),
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Interval> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "1d" | "day" => Some(Interval::Daily),
            "hourly" | "1h" | "hour" => Some(Interval::Hourly),
            _ => None,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
