use serde::{Deserialize, Serialize};

use crate::models::PivotKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub kind: PivotKind,
    pub price: f64,
    pub index: usize,
}

/// Marks every interior point that is strictly above or strictly below both
/// neighbours. Flat runs never produce a pivot. Output is ordered by index.
pub fn extract_pivots(prices: &[f64]) -> Vec<Pivot> {
    let len = prices.len();
    if len < 3 {
        return Vec::new();
    }

    let mut pivots = Vec::new();
    for i in 1..(len - 1) {
        let (prev, current, next) = (prices[i - 1], prices[i], prices[i + 1]);

        let kind = if current > prev && current > next {
            PivotKind::Peak
        } else if current < prev && current < next {
            PivotKind::Trough
        } else {
            continue;
        };

        pivots.push(Pivot {
            kind,
            price: current,
            index: i,
        });
    }

    pivots
}
