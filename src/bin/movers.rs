use anyhow::Result;
use chrono::DateTime;
use tracing_subscriber::{fmt, EnvFilter};

use market_insight::config::Config;
use market_insight::market::{PolygonClient, TradeStream};
use market_insight::models::MarketList;

const LIST_LIMIT: usize = 10;

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

    // movers [TRADES]: print the three market lists, then optionally tail
    // TRADES live ticks for the top gainers.
    let args: Vec<String> = std::env::args().collect();
    let trades: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);

    let mut client = PolygonClient::new(&cfg);
    let mut gainers = Vec::new();

    for list in [MarketList::Gainers, MarketList::Losers, MarketList::MostActive] {
        let quotes = client.market_list(list).await?;

        println!("\n{}", "=".repeat(70));
        println!("  {}", list.to_string().to_uppercase());
        println!("  ───────────────────────────────────");
        for q in quotes.iter().take(LIST_LIMIT) {
            println!(
                "  {:<6} ${:>10.2}  {:+7.2}%  vol {:>12.0}",
                q.symbol,
                q.close,
                q.effective_change_percent(),
                q.volume
            );
        }

        if list == MarketList::Gainers {
            gainers = quotes.iter().take(5).map(|q| q.symbol.clone()).collect();
        }
    }
    println!("{}", "=".repeat(70));

    if trades == 0 || gainers.is_empty() {
        return Ok(());
    }

    let mut stream = TradeStream::connect(&cfg.polygon_stream_url, &cfg.polygon_api_key, &gainers).await?;
    println!("\nStreaming {} trades for {}", trades, gainers.join(","));
    for _ in 0..trades {
        let Some(trade) = stream.next_trade().await else {
            println!("Stream closed");
            break;
        };
        let at = DateTime::from_timestamp_millis(trade.t)
            .map(|t| t.format("%H:%M:%S%.3f").to_string())
            .unwrap_or_default();
        println!("  {} {:<6} ${:.2} x {:.0}", at, trade.sym, trade.p, trade.s);
    }

    Ok(())
}
