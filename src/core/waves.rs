use serde::{Deserialize, Serialize};

use crate::core::pivots::{extract_pivots, Pivot};
use crate::models::{price, PricePoint};

pub const WAVE_CYCLE: [&str; 8] = ["1", "2", "3", "4", "5", "A", "B", "C"];
pub const FIB_MULTIPLIERS: [f64; 3] = [1.618, 2.618, 4.236];
pub const INSUFFICIENT_DATA: &str = "Insufficient data";
/// Histories shorter than this get the insufficient-data sentinel.
pub const MIN_HISTORY_POINTS: usize = 20;

const IMPULSE_MAX_WAVES: usize = 5;
const IMPULSE_BASE_CONFIDENCE: f64 = 75.0;
const CORRECTIVE_BASE_CONFIDENCE: f64 = 65.0;
const CONFIDENCE_PER_WAVE: f64 = 5.0;
const MAX_WAVE_ADJUSTMENT: f64 = 20.0;
const MAX_CONFIDENCE: f64 = 95.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WavePattern {
    pub position_label: String,
    pub total_waves: usize,
    pub is_impulse: bool,
}

impl WavePattern {
    pub fn from_pivot_count(total_waves: usize) -> Self {
        Self {
            position_label: WAVE_CYCLE[total_waves % WAVE_CYCLE.len()].to_string(),
            total_waves,
            is_impulse: total_waves <= IMPULSE_MAX_WAVES,
        }
    }

    pub fn confidence(&self) -> f64 {
        let base = if self.is_impulse {
            IMPULSE_BASE_CONFIDENCE
        } else {
            CORRECTIVE_BASE_CONFIDENCE
        };
        let adjustment = (self.total_waves as f64 * CONFIDENCE_PER_WAVE).min(MAX_WAVE_ADJUSTMENT);
        (base + adjustment).min(MAX_CONFIDENCE)
    }

    pub fn target_from(&self, last_price: f64) -> f64 {
        last_price * FIB_MULTIPLIERS[self.total_waves % FIB_MULTIPLIERS.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveAnalysis {
    pub current_wave: String,
    pub confidence: f64,
    pub next_target: Option<f64>,
}

impl WaveAnalysis {
    pub fn insufficient() -> Self {
        Self {
            current_wave: INSUFFICIENT_DATA.to_string(),
            confidence: 0.0,
            next_target: None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.current_wave == INSUFFICIENT_DATA
    }
}

/// Labels the swing position from the pivot count alone. Pivot shape and
/// magnitude do not influence the result.
pub fn label_waves(pivots: &[Pivot], last_price: f64) -> WaveAnalysis {
    let pattern = WavePattern::from_pivot_count(pivots.len());
    WaveAnalysis {
        confidence: pattern.confidence(),
        next_target: Some(pattern.target_from(last_price)),
        current_wave: pattern.position_label,
    }
}

/// Full wave path over a history. Below [`MIN_HISTORY_POINTS`] observations
/// the sentinel is returned without running pivot extraction.
pub fn analyze_waves(history: &[PricePoint]) -> (WaveAnalysis, Option<WavePattern>) {
    if history.len() < MIN_HISTORY_POINTS {
        return (WaveAnalysis::insufficient(), None);
    }
    let Some(last) = history.last() else {
        return (WaveAnalysis::insufficient(), None);
    };

    let pivots = extract_pivots(&price::prices(history));
    let pattern = WavePattern::from_pivot_count(pivots.len());
    (label_waves(&pivots, last.price), Some(pattern))
}
