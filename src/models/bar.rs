use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{DateMarker, PricePoint};

/// One OHLCV observation, normalized from whichever provider produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn change_percent(&self) -> f64 {
        if self.open == 0.0 {
            return 0.0;
        }
        (self.close - self.open) / self.open * 100.0
    }
}

/// Bars ordered oldest-first.
///
/// Providers disagree on ordering (some return most-recent-first), so
/// construction from raw provider output goes through [`BarSeries::normalized`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Wraps bars that are already oldest-first.
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }

    /// Sorts oldest-first and drops duplicate timestamps (first one wins).
    pub fn normalized(mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn as_slice(&self) -> &[Bar] {
        &self.bars
    }

    pub fn highs_max(&self) -> f64 {
        self.bars
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn lows_min(&self) -> f64 {
        self.bars
            .iter()
            .map(|b| b.low)
            .fold(f64::INFINITY, f64::min)
    }

    /// Bars at or after `ts`.
    pub fn since(&self, ts: DateTime<Utc>) -> BarSeries {
        let start = self.bars.partition_point(|b| b.timestamp < ts);
        BarSeries::new(self.bars[start..].to_vec())
    }

    /// Close prices keyed by unix timestamp, the shape the analytics consume.
    pub fn to_price_points(&self) -> Vec<PricePoint> {
        self.bars
            .iter()
            .map(|b| PricePoint {
                date: DateMarker::Timestamp(b.timestamp.timestamp()),
                price: b.close,
            })
            .collect()
    }
}

impl std::ops::Index<usize> for BarSeries {
    type Output = Bar;
    fn index(&self, index: usize) -> &Self::Output {
        &self.bars[index]
    }
}

impl IntoIterator for BarSeries {
    type Item = Bar;
    type IntoIter = std::vec::IntoIter<Bar>;
    fn into_iter(self) -> Self::IntoIter {
        self.bars.into_iter()
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;
    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}
