use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date marker attached to a price observation. Providers hand back either a
/// formatted date string or a numeric unix timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateMarker {
    Timestamp(i64),
    Text(String),
}

impl fmt::Display for DateMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateMarker::Timestamp(ts) => match DateTime::from_timestamp(*ts, 0) {
                Some(t) => write!(f, "{}", t.format("%Y-%m-%d")),
                None => write!(f, "{}", ts),
            },
            DateMarker::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One historical observation consumed by the analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: DateMarker,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: impl Into<String>, price: f64) -> Self {
        Self {
            date: DateMarker::Text(date.into()),
            price,
        }
    }
}

pub fn prices(points: &[PricePoint]) -> Vec<f64> {
    points.iter().map(|p| p.price).collect()
}
