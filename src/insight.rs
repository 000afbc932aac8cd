use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::completion::{
    CommentaryService, CompletionClient, CompletionError, MarketCommentary,
    RecommendationGenerator, RequestQueue,
};
use crate::config::Config;
use crate::core::{TechnicalAnalysis, TechnicalAnalyzer};
use crate::market::MarketData;
use crate::models::{BarSeries, Interval, PricePoint, Quote, StockRecommendation};
use crate::store::{recommendations_or_demo, RecommendationSet, StoreClient};

/// High, low and open-to-close move over the loaded history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodStats {
    pub high: f64,
    pub low: f64,
    pub change_percent: f64,
}

impl PeriodStats {
    pub fn from_series(series: &BarSeries) -> Option<Self> {
        let (first, last) = (series.first()?, series.last()?);
        let change_percent = if first.open != 0.0 {
            (last.close - first.open) / first.open * 100.0
        } else {
            0.0
        };
        Some(Self {
            high: series.highs_max(),
            low: series.lows_min(),
            change_percent,
        })
    }
}

/// Everything the stock detail view shows for one symbol.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub symbol: String,
    pub quote: Option<Quote>,
    pub period: Option<PeriodStats>,
    pub history: Vec<PricePoint>,
    pub analysis: TechnicalAnalysis,
    /// `None` when no completion service is configured.
    pub commentary: Option<MarketCommentary>,
    pub recommendations: RecommendationSet,
    pub generated_at: DateTime<Utc>,
}

pub struct InsightService {
    market: Box<dyn MarketData>,
    analyzer: TechnicalAnalyzer,
    commentary: Option<CommentaryService>,
    generator: Option<RecommendationGenerator>,
    store: Option<StoreClient>,
}

impl InsightService {
    pub fn new(market: Box<dyn MarketData>, analyzer: TechnicalAnalyzer) -> Self {
        Self {
            market,
            analyzer,
            commentary: None,
            generator: None,
            store: None,
        }
    }

    /// Wires whichever optional services the configuration enables. Both
    /// completion consumers share one queue.
    pub fn from_config(cfg: &Config, market: Box<dyn MarketData>) -> Self {
        let mut service = Self::new(market, TechnicalAnalyzer::new(cfg));

        if cfg.has_completion() {
            match CompletionClient::from_config(cfg) {
                Ok(client) => {
                    let queue = RequestQueue::spawn(cfg.queue_delay());
                    service = service.with_completion(client, queue);
                }
                Err(e) => warn!("Completion disabled: {}", e),
            }
        } else {
            info!("OPENAI_API_KEY not set, commentary disabled");
        }

        if cfg.has_store() {
            match StoreClient::new(cfg) {
                Ok(store) => service = service.with_store(store),
                Err(e) => warn!("Store disabled: {}", e),
            }
        } else {
            info!("Store not configured, recommendations will use demo data");
        }

        service
    }

    pub fn with_completion(mut self, client: CompletionClient, queue: RequestQueue) -> Self {
        self.commentary = Some(CommentaryService::new(client.clone(), queue.clone()));
        self.generator = Some(RecommendationGenerator::new(client, queue));
        self
    }

    pub fn with_store(mut self, store: StoreClient) -> Self {
        self.store = Some(store);
        self
    }

    pub fn store(&self) -> Option<&StoreClient> {
        self.store.as_ref()
    }

    pub async fn dashboard(&mut self, symbol: &str, days: u32) -> Result<Dashboard> {
        let symbol = symbol.trim().to_ascii_uppercase();
        info!("Building dashboard for {} ({} days)", symbol, days);

        let series = self
            .market
            .fetch_history(&symbol, Interval::Daily, days)
            .await
            .with_context(|| format!("Failed to load price history for {}", symbol))?;
        let history = series.to_price_points();
        let period = PeriodStats::from_series(&series);

        // Fall back to the latest loaded bar when the quote endpoint fails.
        let quote = match self.market.fetch_quote(&symbol).await {
            Ok(q) => Some(q),
            Err(e) => {
                warn!("{}: quote unavailable, using last bar: {:#}", symbol, e);
                Quote::from_bars(&symbol, series.as_slice())
            }
        };

        let analysis = self.analyzer.analyze(&symbol, &history);

        let commentary = match &self.commentary {
            Some(service) => {
                let wave = (!analysis.wave.is_insufficient()).then_some(&analysis.wave);
                Some(service.commentary(&symbol, &history, wave).await)
            }
            None => None,
        };

        let recommendations = recommendations_or_demo(self.store.as_ref(), Some(&symbol)).await;
        if recommendations.is_demo {
            info!("{}: showing demo recommendations", symbol);
        }

        Ok(Dashboard {
            symbol,
            quote,
            period,
            history,
            analysis,
            commentary,
            recommendations,
            generated_at: Utc::now(),
        })
    }

    /// Asks the completion service for a fresh recommendation and stores it
    /// when a store is configured. A store failure is logged, not returned.
    pub async fn refresh_recommendation(
        &self,
        symbol: &str,
        analysis: Option<&TechnicalAnalysis>,
    ) -> Result<StockRecommendation, CompletionError> {
        let generator = self.generator.as_ref().ok_or(CompletionError::MissingApiKey)?;
        let rec = generator.generate(symbol, analysis).await?;

        if let Some(store) = &self.store {
            match store.upsert_recommendation(&rec).await {
                Ok(saved) => return Ok(saved),
                Err(e) => warn!("{}: failed to store recommendation: {}", rec.symbol, e),
            }
        }
        Ok(rec)
    }
}
