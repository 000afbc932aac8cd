use chrono::{DateTime, Duration, NaiveDate, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::models::{
    Action, Bar, BarSeries, ConfidenceMetrics, EntryRange, Outlook, PricePoint,
    StockRecommendation, TermAnalysis,
};

/// Create daily bars from (open, high, low, close) tuples starting 2024-01-15.
pub fn make_bars(data: &[(f64, f64, f64, f64)]) -> BarSeries {
    let base = DateTime::parse_from_rfc3339("2024-01-15T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc);

    let bars: Vec<Bar> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Bar {
            timestamp: base + Duration::days(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 1_000.0,
        })
        .collect();

    BarSeries::new(bars)
}

/// Daily points with `YYYY-MM-DD` dates starting 2024-03-01.
pub fn price_points(prices: &[f64]) -> Vec<PricePoint> {
    let base = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let date = base + Duration::days(i as i64);
            PricePoint::new(date.format("%Y-%m-%d").to_string(), p)
        })
        .collect()
}

pub fn sample_recommendation(symbol: &str) -> StockRecommendation {
    let term = |outlook, target: f64| TermAnalysis {
        outlook,
        price_target: Some(target),
        reasoning: "Higher lows with rising volume".to_string(),
    };
    StockRecommendation {
        id: None,
        symbol: symbol.to_string(),
        strategy_type: "momentum".to_string(),
        confidence_metrics: ConfidenceMetrics {
            technical: 80.0,
            fundamental: 70.0,
            sentiment: 75.0,
            overall: Some(75.0),
        },
        short_term_analysis: term(Outlook::Bullish, 110.0),
        medium_term_analysis: term(Outlook::Bullish, 125.0),
        long_term_analysis: term(Outlook::Neutral, 140.0),
        primary_drivers: vec!["Earnings growth".to_string()],
        explanation: "Trend and fundamentals agree.".to_string(),
        entry_range: EntryRange { low: 95.0, high: 102.0 },
        hold_sell_recommendation: Action::Buy,
        recommendation_strength: 72.0,
        created_at: None,
        updated_at: None,
    }
}

pub fn default_test_config() -> Config {
    Config {
        history_api_key: "test-key".to_string(),
        history_base_url: "http://127.0.0.1:9".to_string(),
        polygon_api_key: String::new(),
        polygon_base_url: "http://127.0.0.1:9".to_string(),
        polygon_stream_url: "ws://127.0.0.1:9".to_string(),
        completion_api_key: "test-key".to_string(),
        completion_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
        completion_model: "test-model".to_string(),
        max_retries: 3,
        retry_base_delay_ms: 2000,
        queue_delay_ms: 2000,
        store_url: String::new(),
        store_anon_key: String::new(),
        simulation_iterations: 1000,
        cache_ttl_secs: 60,
        log_level: "ERROR".to_string(),
    }
}

/// One HTTP request as seen by [`serve_once`]. `head` is lowercased.
#[derive(Debug)]
pub struct CapturedRequest {
    pub request_line: String,
    pub head: String,
    pub body: String,
}

impl CapturedRequest {
    pub fn has_header(&self, name: &str, value: &str) -> bool {
        let line = format!("{}: {}", name, value).to_ascii_lowercase();
        self.head.lines().any(|l| l.trim() == line)
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

/// Accepts a single HTTP/1.1 connection on a local port, records the
/// request and answers with `status` and a JSON `reply`. Returns the base
/// URL and a handle resolving to the captured request.
pub async fn serve_once(status: u16, reply: &str) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let reply = reply.to_string();

    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let head_end = loop {
            let n = sock.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending a request");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = find_head_end(&buf) {
                break end;
            }
        };
        let raw_head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let content_length = raw_head
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < head_end + content_length {
            let n = sock.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {} STUB\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            reply.len(),
            reply
        );
        sock.write_all(response.as_bytes()).await.unwrap();
        let _ = sock.shutdown().await;

        CapturedRequest {
            request_line: raw_head.lines().next().unwrap_or_default().to_string(),
            head: raw_head.to_ascii_lowercase(),
            body: String::from_utf8_lossy(&buf[head_end..head_end + content_length]).to_string(),
        }
    });

    (base, handle)
}
