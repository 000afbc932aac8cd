use crate::models::{
    Action, ConfidenceMetrics, EntryRange, Outlook, StockRecommendation, TermAnalysis,
};

/// Recommendations returned by `recommendations_or_demo`.
#[derive(Debug, Clone)]
pub struct RecommendationSet {
    pub items: Vec<StockRecommendation>,
    /// True when `items` are built-in placeholders rather than stored rows.
    pub is_demo: bool,
    /// Set when the store was reachable but the query failed.
    pub error: Option<String>,
}

impl RecommendationSet {
    pub fn stored(items: Vec<StockRecommendation>) -> Self {
        Self { items, is_demo: false, error: None }
    }

    pub fn demo(symbol: Option<&str>, error: Option<String>) -> Self {
        Self { items: demo_recommendations(symbol), is_demo: true, error }
    }
}

fn term(outlook: Outlook, target: f64, reasoning: &str) -> TermAnalysis {
    TermAnalysis {
        outlook,
        price_target: Some(target),
        reasoning: reasoning.to_string(),
    }
}

struct DemoRow {
    symbol: &'static str,
    strategy: &'static str,
    metrics: (f64, f64, f64),
    targets: (f64, f64, f64),
    entry: (f64, f64),
    action: Action,
    strength: f64,
    drivers: &'static [&'static str],
    explanation: &'static str,
}

const DEMO_ROWS: &[DemoRow] = &[
    DemoRow {
        symbol: "AAPL",
        strategy: "growth",
        metrics: (78.0, 82.0, 71.0),
        targets: (195.0, 210.0, 240.0),
        entry: (180.0, 188.0),
        action: Action::Buy,
        strength: 76.0,
        drivers: &["Services revenue growth", "Buyback program", "Higher lows on the daily chart"],
        explanation: "Steady uptrend with strong cash generation.",
    },
    DemoRow {
        symbol: "MSFT",
        strategy: "quality",
        metrics: (72.0, 88.0, 74.0),
        targets: (430.0, 455.0, 500.0),
        entry: (405.0, 420.0),
        action: Action::Hold,
        strength: 68.0,
        drivers: &["Cloud margin expansion", "Consolidation near highs"],
        explanation: "Fundamentals strong, price extended; wait for a pullback.",
    },
    DemoRow {
        symbol: "NVDA",
        strategy: "momentum",
        metrics: (84.0, 79.0, 86.0),
        targets: (950.0, 1050.0, 1200.0),
        entry: (860.0, 910.0),
        action: Action::Buy,
        strength: 81.0,
        drivers: &["Data-center demand", "Wave 3 extension"],
        explanation: "Momentum leader; size positions for volatility.",
    },
];

/// Built-in placeholder rows, optionally filtered to one symbol.
///
/// An unknown symbol gets a neutral hold row so the view is never empty.
pub fn demo_recommendations(symbol: Option<&str>) -> Vec<StockRecommendation> {
    let rows: Vec<StockRecommendation> = DEMO_ROWS
        .iter()
        .filter(|r| symbol.map_or(true, |s| r.symbol.eq_ignore_ascii_case(s)))
        .map(build)
        .collect();

    match (rows.is_empty(), symbol) {
        (true, Some(s)) => vec![neutral(s)],
        _ => rows,
    }
}

fn build(row: &DemoRow) -> StockRecommendation {
    let (technical, fundamental, sentiment) = row.metrics;
    let (short, medium, long) = row.targets;
    StockRecommendation {
        id: None,
        symbol: row.symbol.to_string(),
        strategy_type: row.strategy.to_string(),
        confidence_metrics: ConfidenceMetrics {
            technical,
            fundamental,
            sentiment,
            overall: None,
        },
        short_term_analysis: term(Outlook::Bullish, short, "Demo short-term view"),
        medium_term_analysis: term(Outlook::Bullish, medium, "Demo medium-term view"),
        long_term_analysis: term(Outlook::Bullish, long, "Demo long-term view"),
        primary_drivers: row.drivers.iter().map(|d| d.to_string()).collect(),
        explanation: row.explanation.to_string(),
        entry_range: EntryRange { low: row.entry.0, high: row.entry.1 },
        hold_sell_recommendation: row.action,
        recommendation_strength: row.strength,
        created_at: None,
        updated_at: None,
    }
}

fn neutral(symbol: &str) -> StockRecommendation {
    let view = |label: &str| TermAnalysis {
        outlook: Outlook::Neutral,
        price_target: None,
        reasoning: format!("No stored {} view", label),
    };
    StockRecommendation {
        id: None,
        symbol: symbol.to_ascii_uppercase(),
        strategy_type: "demo".to_string(),
        confidence_metrics: ConfidenceMetrics {
            technical: 50.0,
            fundamental: 50.0,
            sentiment: 50.0,
            overall: None,
        },
        short_term_analysis: view("short-term"),
        medium_term_analysis: view("medium-term"),
        long_term_analysis: view("long-term"),
        primary_drivers: Vec::new(),
        explanation: "Placeholder recommendation; no stored data for this symbol.".to_string(),
        entry_range: EntryRange { low: 0.0, high: 0.0 },
        hold_sell_recommendation: Action::Hold,
        recommendation_strength: 50.0,
        created_at: None,
        updated_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_rows_are_valid() {
        let rows = demo_recommendations(None);
        assert_eq!(rows.len(), DEMO_ROWS.len());
        for r in &rows {
            r.validate().unwrap();
        }
    }

    #[test]
    fn filters_by_symbol() {
        let rows = demo_recommendations(Some("nvda"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "NVDA");
    }

    #[test]
    fn unknown_symbol_gets_neutral_row() {
        let rows = demo_recommendations(Some("zzz"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "ZZZ");
        assert_eq!(rows[0].hold_sell_recommendation, Action::Hold);
        rows[0].validate().unwrap();
    }
}
