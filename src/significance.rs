use chrono::NaiveDate;

use crate::params::{DECAY, SIGNIFICANCE_DECIMALS, TROPICAL_YEAR};

/// Gaussian decay weight of an event `days` before the base date.
pub fn significance_from_days(days: f64) -> f64 {
    let x = days / (DECAY * TROPICAL_YEAR);
    round_to((-(x * x)).exp(), SIGNIFICANCE_DECIMALS)
}

/// Weight of `date` relative to `base`, the newest event in the archive.
pub fn significance(base: NaiveDate, date: NaiveDate) -> f64 {
    let days = (base - date).num_days() as f64;
    significance_from_days(days)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
