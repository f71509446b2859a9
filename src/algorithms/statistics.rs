//! Weighted statistics over RSSI histograms

use crate::core::{SignalHistogram, SignalStatistics};
use crate::validation::error::ValidationError;

/// Count-weighted mean, variance and standard deviation of a histogram (dBm)
///
/// Offsets are taken from the first populated bin so a histogram with a single
/// populated bin has a variance of exactly zero.
pub fn aggregate(histogram: &SignalHistogram) -> Result<SignalStatistics, ValidationError> {
    if histogram.is_empty() {
        return Err(ValidationError::EmptyHistogram);
    }
    let total_weight = histogram.total_weight();
    if total_weight == 0 {
        return Err(ValidationError::ZeroHistogramWeight);
    }
    let weight = total_weight as f64;

    let origin = histogram
        .iter_dbm()
        .find(|&(_, count)| count > 0)
        .map(|(dbm, _)| dbm)
        .ok_or(ValidationError::ZeroHistogramWeight)?;

    let offset_sum: f64 = histogram
        .iter_dbm()
        .map(|(dbm, count)| count as f64 * (dbm - origin))
        .sum();
    let mean_dbm = origin + offset_sum / weight;

    let variance = histogram
        .iter_dbm()
        .map(|(dbm, count)| count as f64 * (dbm - mean_dbm).powi(2))
        .sum::<f64>()
        / weight;

    Ok(SignalStatistics {
        mean_dbm,
        variance,
        std_dev_db: variance.sqrt(),
        total_weight,
    })
}
