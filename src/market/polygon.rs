use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::market::MarketData;
use crate::models::{Bar, BarSeries, Interval, MarketList, Quote};

const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);
const MOST_ACTIVE_LIMIT: usize = 20;

/// Aggregate bar in provider shorthand.
#[derive(Debug, Deserialize)]
struct Agg {
    #[serde(rename = "T", default)]
    ticker: Option<String>,
    c: f64,
    o: f64,
    #[serde(default)]
    h: Option<f64>,
    #[serde(default)]
    l: Option<f64>,
    #[serde(default)]
    v: f64,
    #[serde(default)]
    vw: Option<f64>,
    /// Unix milliseconds
    #[serde(default)]
    t: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AggsResponse {
    #[serde(default)]
    results: Vec<Agg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotTicker {
    ticker: String,
    day: Agg,
    #[serde(default)]
    todays_change_perc: Option<f64>,
    /// Unix nanoseconds
    #[serde(default)]
    updated: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    #[serde(default)]
    tickers: Vec<SnapshotTicker>,
}

fn millis_to_utc(ms: Option<i64>) -> DateTime<Utc> {
    ms.and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}

fn agg_to_quote(symbol: String, agg: &Agg, change_percent: Option<f64>, ts: DateTime<Utc>) -> Quote {
    Quote {
        symbol,
        open: agg.o,
        close: agg.c,
        high: agg.h.unwrap_or(agg.c.max(agg.o)),
        low: agg.l.unwrap_or(agg.c.min(agg.o)),
        volume: agg.v,
        vwap: agg.vw,
        change_percent,
        timestamp: ts,
    }
}

/// `/v2/aggs/ticker/{sym}/prev`
pub fn parse_previous_close(symbol: &str, body: &str) -> Result<Quote> {
    let data: AggsResponse = serde_json::from_str(body).context("Failed to parse aggregate response")?;
    let agg = data
        .results
        .first()
        .with_context(|| format!("No aggregate for {}", symbol))?;
    let sym = agg.ticker.clone().unwrap_or_else(|| symbol.to_string());
    Ok(agg_to_quote(sym, agg, None, millis_to_utc(agg.t)))
}

/// `/v2/aggs/ticker/{sym}/range/...`, returned oldest-first already.
pub fn parse_range(body: &str) -> Result<BarSeries> {
    let data: AggsResponse = serde_json::from_str(body).context("Failed to parse aggregate range")?;
    let bars = data
        .results
        .iter()
        .filter_map(|a| {
            Some(Bar {
                timestamp: DateTime::<Utc>::from_timestamp_millis(a.t?)?,
                open: a.o,
                high: a.h.unwrap_or(a.c.max(a.o)),
                low: a.l.unwrap_or(a.c.min(a.o)),
                close: a.c,
                volume: a.v,
            })
        })
        .collect();
    Ok(BarSeries::normalized(bars))
}

/// Snapshot list endpoints. `MostActive` has no endpoint of its own and is
/// derived from the full snapshot ordered by day volume.
pub fn parse_snapshot(body: &str, list: MarketList) -> Result<Vec<Quote>> {
    let data: SnapshotResponse = serde_json::from_str(body).context("Failed to parse snapshot")?;
    let mut quotes: Vec<Quote> = data
        .tickers
        .into_iter()
        .map(|t| {
            let ts = t
                .updated
                .map(DateTime::<Utc>::from_timestamp_nanos)
                .unwrap_or_else(Utc::now);
            agg_to_quote(t.ticker, &t.day, t.todays_change_perc, ts)
        })
        .collect();

    if list == MarketList::MostActive {
        quotes.sort_by(|a, b| b.volume.total_cmp(&a.volume));
        quotes.truncate(MOST_ACTIVE_LIMIT);
    }
    Ok(quotes)
}

pub struct PolygonClient {
    client: Client,
    base_url: String,
    api_key: String,
    last_request: Option<Instant>,
}

impl PolygonClient {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: cfg.polygon_base_url.trim_end_matches('/').to_string(),
            api_key: cfg.polygon_api_key.clone(),
            last_request: None,
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

    async fn get(&mut self, path: &str) -> Result<String> {
        if self.api_key.is_empty() {
            bail!("POLYGON_API_KEY is not configured");
        }
        self.rate_limit().await;

        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", path))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Polygon API error {}: {}", status, body);
        }
        resp.text().await.context("Failed to read Polygon response")
    }

    pub async fn previous_close(&mut self, symbol: &str) -> Result<Quote> {
        let symbol = symbol.to_ascii_uppercase();
        let body = self.get(&format!("/v2/aggs/ticker/{}/prev", symbol)).await?;
        parse_previous_close(&symbol, &body)
    }

    pub async fn market_list(&mut self, list: MarketList) -> Result<Vec<Quote>> {
        let path = match list {
            MarketList::Gainers => "/v2/snapshot/locale/us/markets/stocks/gainers",
            MarketList::Losers => "/v2/snapshot/locale/us/markets/stocks/losers",
            MarketList::MostActive => "/v2/snapshot/locale/us/markets/stocks/tickers",
        };
        let body = self.get(path).await?;
        parse_snapshot(&body, list)
    }

    pub async fn aggregates(&mut self, symbol: &str, interval: Interval, days: u32) -> Result<BarSeries> {
        let to = Utc::now().date_naive();
        let from = to - ChronoDuration::days(days as i64);
        let span = match interval {
            Interval::Daily => "day",
            Interval::Hourly => "hour",
        };
        let body = self
            .get(&format!(
                "/v2/aggs/ticker/{}/range/1/{}/{}/{}",
                symbol.to_ascii_uppercase(),
                span,
                from.format("%Y-%m-%d"),
                to.format("%Y-%m-%d")
            ))
            .await?;
        parse_range(&body)
    }
}

#[async_trait]
impl MarketData for PolygonClient {
    async fn fetch_history(&mut self, symbol: &str, interval: Interval, days: u32) -> Result<BarSeries> {
        self.aggregates(symbol, interval, days).await
    }

    async fn fetch_quote(&mut self, symbol: &str) -> Result<Quote> {
        self.previous_close(symbol).await
    }
}
