use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Bar;

/// Snapshot quote in one shape regardless of provider field naming
/// (`c/o/v/vw` vs `close/open/volume`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub vwap: Option<f64>,
    pub change_percent: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Percent change, falling back to open/close when the provider didn't send one.
    pub fn effective_change_percent(&self) -> f64 {
        match self.change_percent {
            Some(p) => p,
            None if self.open != 0.0 => (self.close - self.open) / self.open * 100.0,
            None => 0.0,
        }
    }

    /// Quote built from the newest bar. The change is measured against the
    /// previous close, or against the bar's own open when it is the only one.
    pub fn from_bars(symbol: &str, bars: &[Bar]) -> Option<Quote> {
        let last = bars.last()?;
        let change_percent = match bars.len().checked_sub(2).map(|i| bars[i].close) {
            Some(prev) if prev != 0.0 => (last.close - prev) / prev * 100.0,
            Some(_) => 0.0,
            None => last.change_percent(),
        };

        Some(Quote {
            symbol: symbol.to_ascii_uppercase(),
            open: last.open,
            close: last.close,
            high: last.high,
            low: last.low,
            volume: last.volume,
            vwap: None,
            change_percent: Some(change_percent),
            timestamp: last.timestamp,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketList {
    Gainers,
    Losers,
    MostActive,
}

impl fmt::Display for MarketList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketList::Gainers => write!(f, "gainers"),
            MarketList::Losers => write!(f, "losers"),
            MarketList::MostActive => write!(f, "most_active"),
        }
    }
}
