use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::market::MarketData;
use crate::models::{Bar, BarSeries, Interval, Quote};

/// A MarketData implementation over pre-loaded bars. A cursor (`now`)
/// controls which bars are visible, so a stored history can be replayed.
pub struct StaticMarket {
    data: HashMap<(String, Interval), Vec<Bar>>,
    now: DateTime<Utc>,
}

impl StaticMarket {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            now: Utc::now(),
        }
    }

    /// Bars must be sorted oldest-first.
    pub fn load(&mut self, symbol: &str, interval: Interval, bars: Vec<Bar>) {
        self.data.insert((symbol.to_ascii_uppercase(), interval), bars);
    }

    pub fn set_time(&mut self, t: DateTime<Utc>) {
        self.now = t;
    }

    pub fn current_time(&self) -> DateTime<Utc> {
        self.now
    }

    /// Latest timestamp across all loaded series.
    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.data
            .values()
            .filter_map(|v| v.last().map(|b| b.timestamp))
            .max()
    }

    fn visible(&self, symbol: &str, interval: Interval) -> &[Bar] {
        let Some(all) = self.data.get(&(symbol.to_ascii_uppercase(), interval)) else {
            return &[];
        };
        let end = all.partition_point(|b| b.timestamp <= self.now);
        &all[..end]
    }
}

impl Default for StaticMarket {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketData for StaticMarket {
    async fn fetch_history(&mut self, symbol: &str, interval: Interval, days: u32) -> Result<BarSeries> {
        let cutoff = self.now - Duration::days(days as i64);
        let visible = BarSeries::new(self.visible(symbol, interval).to_vec());
        Ok(visible.since(cutoff))
    }

    async fn fetch_quote(&mut self, symbol: &str) -> Result<Quote> {
        Quote::from_bars(symbol, self.visible(symbol, Interval::Daily))
            .with_context(|| format!("No price data for {} at current time", symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_bars;

    fn market() -> StaticMarket {
        let bars = make_bars(&[
            (100.0, 105.0, 95.0, 100.0),
            (100.0, 112.0, 99.0, 110.0),
            (110.0, 116.0, 108.0, 115.0),
            (115.0, 120.0, 110.0, 118.0),
        ]);
        let mut m = StaticMarket::new();
        m.load("aapl", Interval::Daily, bars.into_iter().collect());
        m
    }

    #[tokio::test]
    async fn cursor_hides_future_bars() {
        let mut m = market();
        let latest = m.latest_time().unwrap();
        m.set_time(latest - Duration::days(2));

        let series = m.fetch_history("AAPL", Interval::Daily, 365).await.unwrap();
        assert_eq!(series.len(), 2);

        let q = m.fetch_quote("AAPL").await.unwrap();
        assert_eq!(q.close, 110.0);
        assert!((q.change_percent.unwrap() - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn days_window_limits_history() {
        let mut m = market();
        let latest = m.latest_time().unwrap();
        m.set_time(latest);
        let series = m.fetch_history("AAPL", Interval::Daily, 1).await.unwrap();
        assert_eq!(series.len(), 2);
    }

    #[tokio::test]
    async fn unknown_symbol() {
        let mut m = market();
        assert!(m.fetch_history("ZZZ", Interval::Daily, 30).await.unwrap().is_empty());
        assert!(m.fetch_quote("ZZZ").await.is_err());
        assert!(m.fetch_history("AAPL", Interval::Hourly, 30).await.unwrap().is_empty());
    }
}
