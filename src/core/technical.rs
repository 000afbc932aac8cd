use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::core::bands::{simulate_bands, SimulatedBand};
use crate::core::waves::{analyze_waves, WaveAnalysis, WavePattern};
use crate::models::PricePoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    pub symbol: String,
    pub wave: WaveAnalysis,
    pub pattern: Option<WavePattern>,
    pub bands: Vec<SimulatedBand>,
    pub last_price: Option<f64>,
    pub generated_at: DateTime<Utc>,
}

impl TechnicalAnalysis {
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Symbol:        {}", self.symbol)];

        match self.last_price {
            Some(p) => lines.push(format!("Last price:    ${:.2}", p)),
            None => lines.push("Last price:    n/a".to_string()),
        }

        lines.push(format!("Wave:          {}", self.wave.current_wave));
        lines.push(format!("Confidence:    {:.0}%", self.wave.confidence));
        if let Some(target) = self.wave.next_target {
            lines.push(format!("Next target:   ${:.2}", target));
        }
        if let Some(p) = &self.pattern {
            lines.push(format!(
                "Pattern:       {} swings ({})",
                p.total_waves,
                if p.is_impulse { "impulse" } else { "corrective" }
            ));
        }

        if let (Some(first), Some(last)) = (self.bands.first(), self.bands.last()) {
            lines.push(format!(
                "Bands:         {} days {} -> {}",
                self.bands.len(),
                first.date,
                last.date
            ));
            lines.push(format!(
                "  Day 1:       {:.2} / {:.2} / {:.2}",
                first.lower_bound, first.median, first.upper_bound
            ));
        }

        lines
    }
}

/// Runs the wave path and the band path over the same history.
pub struct TechnicalAnalyzer {
    iterations: usize,
}

impl TechnicalAnalyzer {
    pub fn new(cfg: &Config) -> Self {
        Self::with_iterations(cfg.simulation_iterations)
    }

    pub fn with_iterations(iterations: usize) -> Self {
        Self { iterations }
    }

    pub fn analyze(&self, symbol: &str, history: &[PricePoint]) -> TechnicalAnalysis {
        let (wave, pattern) = analyze_waves(history);

        // Bands need at least one observation upstream; beyond that the
        // history does not feed the bounds.
        let bands = if history.is_empty() {
            Vec::new()
        } else {
            simulate_bands(history, self.iterations)
        };

        debug!(
            "{}: {} points, wave={} confidence={:.0} bands={}",
            symbol,
            history.len(),
            wave.current_wave,
            wave.confidence,
            bands.len()
        );

        TechnicalAnalysis {
            symbol: symbol.to_string(),
            wave,
            pattern,
            bands,
            last_price: history.last().map(|p| p.price),
            generated_at: Utc::now(),
        }
    }
}
