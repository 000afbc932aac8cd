use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use market_insight::config::Config;
use market_insight::insight::InsightService;
use market_insight::market::{HistoryClient, MarketData, PolygonClient};
use market_insight::report::print_dashboard;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let symbol = args.get(1).cloned().unwrap_or_else(|| "AAPL".to_string());
    let days: u32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(120);

    let market: Box<dyn MarketData> = if !cfg.history_api_key.is_empty() {
        Box::new(HistoryClient::new(&cfg))
    } else if !cfg.polygon_api_key.is_empty() {
        info!("HISTORY_API_KEY not set, using snapshot provider aggregates");
        Box::new(PolygonClient::new(&cfg))
    } else {
        bail!("Set HISTORY_API_KEY or POLYGON_API_KEY in .env");
    };

    let mut service = InsightService::from_config(&cfg, market);
    let dashboard = service.dashboard(&symbol, days).await?;
    print_dashboard(&dashboard);

    Ok(())
}
