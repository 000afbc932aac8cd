use chrono::{Duration, NaiveDate, Utc};
use chrono_tz::US::Eastern;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::PricePoint;

pub const BAND_DAYS: usize = 100;

const LOWER_BASE: f64 = 100.0;
const UPPER_BASE: f64 = 150.0;
const MEDIAN_BASE: f64 = 125.0;
const SPREAD: f64 = 10.0;

/// One forward day of the projected price envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedBand {
    pub date: NaiveDate,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub median: f64,
}

/// Produces `BAND_DAYS` buckets starting at `start`.
///
/// The bounds are drawn from fixed static ranges and do not depend on the
/// history's drift or volatility, nor on `iterations`. `median` can fall
/// outside `[lower_bound, upper_bound]`.
pub fn synthesize_bands<R: Rng + ?Sized>(
    _history: &[PricePoint],
    _iterations: usize,
    start: NaiveDate,
    rng: &mut R,
) -> Vec<SimulatedBand> {
    (0..BAND_DAYS)
        .map(|i| SimulatedBand {
            date: start + Duration::days(i as i64),
            lower_bound: LOWER_BASE - rng.gen::<f64>() * SPREAD,
            upper_bound: UPPER_BASE + rng.gen::<f64>() * SPREAD,
            median: MEDIAN_BASE + (rng.gen::<f64>() - 0.5) * SPREAD,
        })
        .collect()
}

/// Bands starting today on the US/Eastern calendar.
pub fn simulate_bands(history: &[PricePoint], iterations: usize) -> Vec<SimulatedBand> {
    let today = Utc::now().with_timezone(&Eastern).date_naive();
    synthesize_bands(history, iterations, today, &mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::price_points;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 27).unwrap()
    }

    #[test]
    fn always_one_hundred_buckets() {
        let mut rng = StdRng::seed_from_u64(7);
        for history in [vec![], price_points(&[1.0; 5]), price_points(&[50.0; 500])] {
            let bands = synthesize_bands(&history, 1000, start(), &mut rng);
            assert_eq!(bands.len(), 100);
        }
    }

    #[test]
    fn bounds_stay_in_static_ranges() {
        let mut rng = StdRng::seed_from_u64(42);
        let bands = synthesize_bands(&[], 10, start(), &mut rng);
        for b in &bands {
            assert!(b.lower_bound > 90.0 && b.lower_bound <= 100.0, "{:?}", b);
            assert!(b.upper_bound >= 150.0 && b.upper_bound < 160.0, "{:?}", b);
            assert!(b.median >= 120.0 && b.median < 130.0, "{:?}", b);
            assert!(b.lower_bound < b.upper_bound);
        }
    }

    #[test]
    fn dates_advance_one_day_at_a_time() {
        let mut rng = StdRng::seed_from_u64(1);
        // crosses the Feb 29 leap day
        let bands = synthesize_bands(&[], 10, start(), &mut rng);
        assert_eq!(bands[0].date, start());
        for pair in bands.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }
        assert_eq!(bands[2].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn input_does_not_shape_bounds() {
        let a = synthesize_bands(&price_points(&[1.0; 30]), 10, start(), &mut StdRng::seed_from_u64(9));
        let b = synthesize_bands(&price_points(&[5000.0; 30]), 99_999, start(), &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn live_bands_start_today() {
        let bands = simulate_bands(&[], 100);
        assert_eq!(bands.len(), BAND_DAYS);
        let today = Utc::now().with_timezone(&Eastern).date_naive();
        assert!((bands[0].date - today).num_days().abs() <= 1);
    }
}
