use anyhow::{bail, Context, Result};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

const TRADE_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trade {
    pub sym: String,
    pub p: f64,
    #[serde(default)]
    pub s: f64,
    /// Unix milliseconds
    #[serde(default)]
    pub t: i64,
}

/// Inbound feed events, tagged by `ev`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "ev")]
pub enum StreamEvent {
    #[serde(rename = "T")]
    Trade(Trade),
    #[serde(rename = "status")]
    Status {
        status: String,
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Other,
}

/// A frame is normally a JSON array of events; a lone object is accepted too.
pub fn parse_frame(text: &str) -> Result<Vec<StreamEvent>> {
    if text.trim_start().starts_with('[') {
        serde_json::from_str(text).context("Failed to parse stream frame")
    } else {
        let event: StreamEvent = serde_json::from_str(text).context("Failed to parse stream event")?;
        Ok(vec![event])
    }
}

pub fn auth_message(api_key: &str) -> String {
    serde_json::json!({"action": "auth", "params": api_key}).to_string()
}

pub fn subscribe_message(tickers: &[String]) -> String {
    let params: Vec<String> = tickers
        .iter()
        .map(|t| format!("T.{}", t.to_ascii_uppercase()))
        .collect();
    serde_json::json!({"action": "subscribe", "params": params.join(",")}).to_string()
}

/// Live trade ticks for a fixed ticker list.
pub struct TradeStream {
    trades: mpsc::Receiver<Trade>,
    task: JoinHandle<()>,
}

impl TradeStream {
    pub async fn connect(url: &str, api_key: &str, tickers: &[String]) -> Result<Self> {
        if api_key.is_empty() {
            bail!("POLYGON_API_KEY is not configured");
        }
        if tickers.is_empty() {
            bail!("No tickers to subscribe to");
        }

        let (ws, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;
        let (mut write, mut read) = ws.split();

        write
            .send(Message::Text(auth_message(api_key)))
            .await
            .context("Failed to send auth")?;
        write
            .send(Message::Text(subscribe_message(tickers)))
            .await
            .context("Failed to send subscribe")?;
        info!("Subscribed to trades for {}", tickers.join(","));

        let (tx, rx) = mpsc::channel(TRADE_CHANNEL_CAPACITY);
        let task = tokio::spawn(async move {
            let _write = write;
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        let events = match parse_frame(&text) {
                            Ok(events) => events,
                            Err(e) => {
                                warn!("Dropping stream frame: {}", e);
                                continue;
                            }
                        };
                        for event in events {
                            match event {
                                StreamEvent::Trade(trade) => {
                                    if tx.send(trade).await.is_err() {
                                        debug!("Trade receiver dropped, closing stream");
                                        return;
                                    }
                                }
                                StreamEvent::Status { status, message } => {
                                    debug!("Stream status {}: {}", status, message);
                                }
                                StreamEvent::Other => {}
                            }
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        info!("Stream closed by server: {:?}", frame);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Stream error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self { trades: rx, task })
    }

    /// Next trade tick, or `None` once the connection is gone.
    pub async fn next_trade(&mut self) -> Option<Trade> {
        self.trades.recv().await
    }
}

impl Drop for TradeStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_frame() {
        let frame = r#"[
            {"ev":"status","status":"auth_success","message":"authenticated"},
            {"ev":"T","sym":"MSFT","x":4,"i":"12345","z":3,"p":414.12,"s":100,"c":[0,12],"t":1536036818784,"q":3681328},
            {"ev":"Q","sym":"MSFT","bp":414.0,"ap":414.2}
        ]"#;
        let events = parse_frame(frame).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[1],
            StreamEvent::Trade(Trade {
                sym: "MSFT".to_string(),
                p: 414.12,
                s: 100.0,
                t: 1536036818784
            })
        );
        assert!(matches!(&events[0], StreamEvent::Status { status, .. } if status == "auth_success"));
        assert_eq!(events[2], StreamEvent::Other);
    }

    #[test]
    fn single_object_frame() {
        let events = parse_frame(r#"{"ev":"T","sym":"AAPL","p":171.0}"#).unwrap();
        assert!(matches!(&events[0], StreamEvent::Trade(t) if t.sym == "AAPL" && t.s == 0.0));
    }

    #[test]
    fn garbage_frame_errors() {
        assert!(parse_frame("not json").is_err());
        assert!(parse_frame(r#"[{"ev":"T","sym":"AAPL"}]"#).is_err());
    }

    #[test]
    fn control_messages() {
        let sub: serde_json::Value =
            serde_json::from_str(&subscribe_message(&["aapl".to_string(), "MSFT".to_string()])).unwrap();
        assert_eq!(sub["action"], "subscribe");
        assert_eq!(sub["params"], "T.AAPL,T.MSFT");

        let auth: serde_json::Value = serde_json::from_str(&auth_message("k")).unwrap();
        assert_eq!(auth["params"], "k");
    }

    #[tokio::test]
    async fn connect_requires_key_and_tickers() {
        assert!(TradeStream::connect("wss://example.invalid", "", &["AAPL".to_string()])
            .await
            .is_err());
        assert!(TradeStream::connect("wss://example.invalid", "k", &[]).await.is_err());
    }
}
