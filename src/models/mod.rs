pub mod bar;
pub mod direction;
pub mod interval;
pub mod price;
pub mod quote;
pub mod recommendation;

pub use bar::{Bar, BarSeries};
pub use direction::*;
pub use interval::Interval;
pub use price::{DateMarker, PricePoint};
pub use quote::{MarketList, Quote};
pub use recommendation::{Action, ConfidenceMetrics, EntryRange, StockRecommendation, TermAnalysis};
