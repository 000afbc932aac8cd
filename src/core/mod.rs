pub mod bands;
pub mod pivots;
pub mod technical;
pub mod waves;

pub use bands::SimulatedBand;
pub use pivots::Pivot;
pub use technical::{TechnicalAnalysis, TechnicalAnalyzer};
pub use waves::{WaveAnalysis, WavePattern};
