use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::US::Eastern;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::Config;
use crate::market::MarketData;
use crate::models::{Bar, BarSeries, Interval, Quote};

const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(default)]
    historical: Vec<RawBar>,
}

#[derive(Debug, Deserialize)]
struct RawBar {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuote {
    symbol: String,
    price: f64,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    day_high: Option<f64>,
    #[serde(default)]
    day_low: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
    #[serde(default)]
    changes_percentage: Option<f64>,
    #[serde(default)]
    timestamp: Option<i64>,
}

fn to_bar(raw: RawBar, timestamp: DateTime<Utc>) -> Bar {
    Bar {
        timestamp,
        open: raw.open,
        high: raw.high,
        low: raw.low,
        close: raw.close,
        volume: raw.volume,
    }
}

/// Daily endpoint: `{symbol, historical: [...]}`, most-recent-first, `YYYY-MM-DD` dates.
pub fn parse_daily(body: &str) -> Result<BarSeries> {
    let data: DailyResponse = serde_json::from_str(body).context("Failed to parse daily history")?;
    let bars = data
        .historical
        .into_iter()
        .filter_map(|raw| {
            let date = NaiveDate::parse_from_str(&raw.date, "%Y-%m-%d").ok()?;
            let ts = date.and_hms_opt(0, 0, 0)?.and_utc();
            Some(to_bar(raw, ts))
        })
        .collect();
    Ok(BarSeries::normalized(bars))
}

/// Hourly endpoint: bare array with exchange-local `YYYY-MM-DD HH:MM:SS` dates.
pub fn parse_hourly(body: &str) -> Result<BarSeries> {
    let raw: Vec<RawBar> = serde_json::from_str(body).context("Failed to parse hourly history")?;
    let bars = raw
        .into_iter()
        .filter_map(|raw| {
            let local = NaiveDateTime::parse_from_str(&raw.date, "%Y-%m-%d %H:%M:%S").ok()?;
            let ts = Eastern.from_local_datetime(&local).earliest()?.with_timezone(&Utc);
            Some(to_bar(raw, ts))
        })
        .collect();
    Ok(BarSeries::normalized(bars))
}

pub fn parse_quote(body: &str) -> Result<Quote> {
    let quotes: Vec<RawQuote> = serde_json::from_str(body).context("Failed to parse quote")?;
    let q = quotes.into_iter().next().context("Empty quote response")?;
    let timestamp = q
        .timestamp
        .and_then(|t| DateTime::from_timestamp(t, 0))
        .unwrap_or_else(Utc::now);
    Ok(Quote {
        open: q.open.unwrap_or(q.price),
        high: q.day_high.unwrap_or(q.price),
        low: q.day_low.unwrap_or(q.price),
        close: q.price,
        volume: q.volume.unwrap_or(0.0),
        vwap: None,
        change_percent: q.changes_percentage,
        symbol: q.symbol,
        timestamp,
    })
}

/// Time-series history provider with a short-lived response cache so repeated
/// dashboard loads for the same symbol don't hit the API again.
pub struct HistoryClient {
    client: Client,
    base_url: String,
    api_key: String,
    last_request: Option<Instant>,
    cache: HashMap<String, (Instant, BarSeries)>,
    cache_ttl: Duration,
}

impl HistoryClient {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: cfg.history_base_url.trim_end_matches('/').to_string(),
            api_key: cfg.history_api_key.clone(),
            last_request: None,
            cache: HashMap::new(),
            cache_ttl: cfg.cache_ttl(),
        }
    }

    async fn rate_limit(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    async fn get(&mut self, path: &str, query: &[(&str, String)]) -> Result<String> {
        if self.api_key.is_empty() {
            bail!("HISTORY_API_KEY is not configured");
        }
        self.rate_limit().await;

        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", path))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("History API error {}: {}", status, body);
        }
        resp.text().await.context("Failed to read history response")
    }

    pub async fn fetch_history(&mut self, symbol: &str, interval: Interval, days: u32) -> Result<BarSeries> {
        let symbol = symbol.to_ascii_uppercase();
        let cache_key = format!("{}_{}_{}", symbol, interval, days);
        if let Some(series) = self.cached(&cache_key) {
            debug!("History cache hit {}", cache_key);
            return Ok(series);
        }

        let to = Utc::now().date_naive();
        let from = to - ChronoDuration::days(days as i64);
        let range = [
            ("from", from.format("%Y-%m-%d").to_string()),
            ("to", to.format("%Y-%m-%d").to_string()),
        ];

        let series = match interval {
            Interval::Daily => {
                let body = self
                    .get(&format!("/historical-price-full/{}", symbol), &range)
                    .await?;
                parse_daily(&body)?
            }
            Interval::Hourly => {
                let body = self
                    .get(&format!("/historical-chart/1hour/{}", symbol), &range)
                    .await?;
                parse_hourly(&body)?
            }
        };
        debug!("Fetched {} {} bars for {}", series.len(), interval, symbol);

        self.remember(cache_key, series.clone());
        Ok(series)
    }

    fn cached(&self, key: &str) -> Option<BarSeries> {
        self.cache
            .get(key)
            .filter(|(at, _)| at.elapsed() < self.cache_ttl)
            .map(|(_, series)| series.clone())
    }

    /// Inserts a fresh entry and drops every expired one.
    fn remember(&mut self, key: String, series: BarSeries) {
        let ttl = self.cache_ttl;
        self.cache.retain(|_, (at, _)| at.elapsed() < ttl);
        self.cache.insert(key, (Instant::now(), series));
    }

    pub async fn fetch_quote(&mut self, symbol: &str) -> Result<Quote> {
        let body = self
            .get(&format!("/quote/{}", symbol.to_ascii_uppercase()), &[])
            .await?;
        parse_quote(&body)
    }
}

#[async_trait]
impl MarketData for HistoryClient {
    async fn fetch_history(&mut self, symbol: &str, interval: Interval, days: u32) -> Result<BarSeries> {
        self.fetch_history(symbol, interval, days).await
    }

    async fn fetch_quote(&mut self, symbol: &str) -> Result<Quote> {
        self.fetch_quote(symbol).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{default_test_config, make_bars};
    use chrono::Timelike;

    #[test]
    fn daily_is_reordered_oldest_first() {
        let body = r#"{"symbol":"AAPL","historical":[
            {"date":"2024-03-05","open":170.0,"high":172.0,"low":169.0,"close":171.0,"volume":1000},
            {"date":"2024-03-04","open":168.0,"high":171.0,"low":167.0,"close":170.0,"volume":900},
            {"date":"not-a-date","open":1.0,"high":1.0,"low":1.0,"close":1.0,"volume":1}
        ]}"#;
        let series = parse_daily(body).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!((series[0].close, series[1].close), (170.0, 171.0));
        assert_eq!(series[0].timestamp.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[test]
    fn daily_without_history_is_empty() {
        assert!(parse_daily(r#"{"Error Message":"Invalid API KEY."}"#).unwrap().is_empty());
    }

    #[test]
    fn hourly_dates_are_eastern() {
        let body = r#"[
            {"date":"2024-07-01 10:00:00","open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":10},
            {"date":"2024-07-01 09:00:00","open":1.1,"high":2.1,"low":0.6,"close":1.6,"volume":11}
        ]"#;
        let series = parse_hourly(body).unwrap();
        assert_eq!(series.len(), 2);
        // EDT is UTC-4
        assert_eq!(series[0].timestamp.hour(), 13);
        assert_eq!(series[1].close, 1.5);
    }

    #[test]
    fn quote_fills_missing_fields_from_price() {
        let q = parse_quote(r#"[{"symbol":"MSFT","price":410.5,"changesPercentage":1.2,"timestamp":1709251200}]"#)
            .unwrap();
        assert_eq!(q.symbol, "MSFT");
        assert_eq!(q.open, 410.5);
        assert_eq!(q.change_percent, Some(1.2));
        assert_eq!(q.timestamp.timestamp(), 1709251200);
        assert!(parse_quote("[]").is_err());
    }

    #[test]
    fn cache_serves_fresh_entries() {
        let mut client = HistoryClient::new(&default_test_config());
        let series = make_bars(&[(1.0, 2.0, 0.5, 1.5)]);
        client.remember("AAPL_daily_30".to_string(), series.clone());
        client.remember("MSFT_daily_30".to_string(), series.clone());

        assert_eq!(client.cache.len(), 2);
        assert_eq!(client.cached("AAPL_daily_30"), Some(series));
        assert!(client.cached("NVDA_daily_30").is_none());
    }

    #[test]
    fn expired_entries_are_pruned_on_insert() {
        let mut cfg = default_test_config();
        cfg.cache_ttl_secs = 0;
        let mut client = HistoryClient::new(&cfg);
        let series = make_bars(&[(1.0, 2.0, 0.5, 1.5)]);

        for symbol in ["AAPL", "MSFT", "NVDA", "AMD"] {
            client.remember(format!("{}_daily_30", symbol), series.clone());
        }
        assert_eq!(client.cache.len(), 1);
        assert!(client.cached("AMD_daily_30").is_none());
    }

    #[tokio::test]
    async fn missing_key_fails_before_request() {
        let mut cfg = default_test_config();
        cfg.history_api_key = String::new();
        let mut client = HistoryClient::new(&cfg);
        let err = client
            .fetch_history("AAPL", Interval::Daily, 30)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HISTORY_API_KEY"));
    }
}
