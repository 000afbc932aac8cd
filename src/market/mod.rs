pub mod history;
pub mod polygon;
pub mod static_market;
pub mod stream;

pub use history::HistoryClient;
pub use polygon::PolygonClient;
pub use static_market::StaticMarket;
pub use stream::{StreamEvent, Trade, TradeStream};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{BarSeries, Interval, Quote};

#[async_trait]
pub trait MarketData: Send + Sync {
    /// Bars covering the last `days` calendar days, oldest-first.
    async fn fetch_history(&mut self, symbol: &str, interval: Interval, days: u32) -> Result<BarSeries>;
    async fn fetch_quote(&mut self, symbol: &str) -> Result<Quote>;
}
