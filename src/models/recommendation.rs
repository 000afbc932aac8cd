use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Outlook;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Hold,
    Sell,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "buy"),
            Action::Hold => write!(f, "hold"),
            Action::Sell => write!(f, "sell"),
        }
    }
}

/// Component scores, each on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceMetrics {
    pub technical: f64,
    pub fundamental: f64,
    pub sentiment: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall: Option<f64>,
}

impl ConfidenceMetrics {
    pub fn overall_or_mean(&self) -> f64 {
        self.overall
            .unwrap_or((self.technical + self.fundamental + self.sentiment) / 3.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermAnalysis {
    pub outlook: Outlook,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_target: Option<f64>,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRange {
    pub low: f64,
    pub high: f64,
}

impl EntryRange {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }
}

/// One row of `stock_recommendations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecommendation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub symbol: String,
    pub strategy_type: String,
    pub confidence_metrics: ConfidenceMetrics,
    pub short_term_analysis: TermAnalysis,
    pub medium_term_analysis: TermAnalysis,
    pub long_term_analysis: TermAnalysis,
    #[serde(default)]
    pub primary_drivers: Vec<String>,
    pub explanation: String,
    pub entry_range: EntryRange,
    pub hold_sell_recommendation: Action,
    pub recommendation_strength: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StockRecommendation {
    /// Checks the value ranges serde can't express.
    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.trim().is_empty() {
            return Err("symbol is empty".to_string());
        }
        if !(0.0..=100.0).contains(&self.recommendation_strength) {
            return Err(format!(
                "recommendation_strength {} outside 0-100",
                self.recommendation_strength
            ));
        }
        let m = &self.confidence_metrics;
        for (name, v) in [
            ("technical", m.technical),
            ("fundamental", m.fundamental),
            ("sentiment", m.sentiment),
        ] {
            if !(0.0..=100.0).contains(&v) {
                return Err(format!("confidence_metrics.{} {} outside 0-100", name, v));
            }
        }
        if self.entry_range.low > self.entry_range.high {
            return Err(format!(
                "entry_range low {} above high {}",
                self.entry_range.low, self.entry_range.high
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_recommendation;

    #[test]
    fn decodes_store_row() {
        let row = r#"{
            "id": "b1f0",
            "symbol": "MSFT",
            "strategy_type": "growth",
            "confidence_metrics": {"technical": 70, "fundamental": 80, "sentiment": 60},
            "short_term_analysis": {"outlook": "bullish", "price_target": 430.0, "reasoning": "momentum"},
            "medium_term_analysis": {"outlook": "neutral", "reasoning": "range"},
            "long_term_analysis": {"outlook": "bullish", "reasoning": "cloud"},
            "primary_drivers": ["Azure", "Copilot"],
            "explanation": "Steady compounding",
            "entry_range": {"low": 400.0, "high": 415.0},
            "hold_sell_recommendation": "buy",
            "recommendation_strength": 78,
            "created_at": "2024-05-01T12:00:00Z"
        }"#;
        let rec: StockRecommendation = serde_json::from_str(row).unwrap();
        assert_eq!(rec.hold_sell_recommendation, Action::Buy);
        assert_eq!(rec.medium_term_analysis.price_target, None);
        assert!((rec.confidence_metrics.overall_or_mean() - 70.0).abs() < 1e-9);
        assert!(rec.entry_range.contains(410.0));
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn unknown_action_is_rejected() {
        let mut value = serde_json::to_value(sample_recommendation("AAPL")).unwrap();
        value["hold_sell_recommendation"] = serde_json::json!("moon");
        assert!(serde_json::from_value::<StockRecommendation>(value).is_err());
    }

    #[test]
    fn validate_catches_out_of_range_values() {
        let mut rec = sample_recommendation("AAPL");
        rec.recommendation_strength = 120.0;
        assert!(rec.validate().is_err());

        let mut rec = sample_recommendation("AAPL");
        rec.entry_range = EntryRange {
            low: 10.0,
            high: 5.0,
        };
        assert!(rec.validate().is_err());

        let mut rec = sample_recommendation("AAPL");
        rec.symbol = "  ".to_string();
        assert!(rec.validate().is_err());
    }
}
