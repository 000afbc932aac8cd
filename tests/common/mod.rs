use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use market_insight::completion::{CompletionBackend, CompletionError, CompletionRequest};
use market_insight::market::MarketData;
use market_insight::models::{Bar, BarSeries, Interval, Quote};

/// Alternating closes: every interior point is a pivot (18 of them).
pub const SCENARIO: [f64; 20] = [
    10.0, 12.0, 9.0, 15.0, 11.0, 14.0, 8.0, 13.0, 10.0, 16.0, 12.0, 17.0, 9.0, 18.0, 11.0,
    19.0, 8.0, 20.0, 10.0, 21.0,
];

/// Create daily bars from closes, starting 2024-01-15.
pub fn bars_from_closes(closes: &[f64]) -> BarSeries {
    let base = DateTime::parse_from_rfc3339("2024-01-15T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc);

    let bars: Vec<Bar> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar {
            timestamp: base + Duration::days(i as i64),
            open: c,
            high: c + 0.5,
            low: c - 0.5,
            close: c,
            volume: 1_000.0,
        })
        .collect();

    BarSeries::new(bars)
}

/// A market that serves one canned series, or fails every call.
pub struct MockMarket {
    pub series: Option<BarSeries>,
    pub history_calls: usize,
}

impl MockMarket {
    pub fn new(closes: &[f64]) -> Self {
        Self {
            series: Some(bars_from_closes(closes)),
            history_calls: 0,
        }
    }

    pub fn failing() -> Self {
        Self {
            series: None,
            history_calls: 0,
        }
    }
}

#[async_trait]
impl MarketData for MockMarket {
    async fn fetch_history(&mut self, _symbol: &str, _interval: Interval, _days: u32) -> Result<BarSeries> {
        self.history_calls += 1;
        match &self.series {
            Some(s) => Ok(s.clone()),
            None => bail!("provider unavailable"),
        }
    }

    async fn fetch_quote(&mut self, symbol: &str) -> Result<Quote> {
        let Some(last) = self.series.as_ref().and_then(|s| s.last().cloned()) else {
            bail!("provider unavailable");
        };
        Ok(Quote {
            symbol: symbol.to_string(),
            open: last.open,
            close: last.close,
            high: last.high,
            low: last.low,
            volume: last.volume,
            vwap: None,
            change_percent: Some(1.5),
            timestamp: last.timestamp,
        })
    }
}

/// Replays scripted results in order; the last one repeats.
pub struct ScriptedBackend {
    script: Mutex<Vec<Result<String, CompletionError>>>,
    pub calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<String, CompletionError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.remove(0)
        } else {
            script[0].clone()
        }
    }
}
