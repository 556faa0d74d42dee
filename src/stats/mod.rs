//! Descriptive statistics and information-theoretic helpers.
//!
//! ## Moments
//!
//! - [`Summary`]: count, mean, spread and quantiles of per-row distances
//! - [`mean`], [`variance`]: population moments
//!
//! ## Entropy
//!
//! - [`entropy`]: Shannon entropy (nats) of a count vector
//! - [`conditional_entropy`]: `H(y | x)` from paired discrete samples
//! - [`value_counts`]: Occurrence counts of discrete `f64` values

mod entropy;

pub(crate) use entropy::key;
pub use entropy::{conditional_entropy, entropy, entropy_of, value_counts};

use serde::{Deserialize, Serialize};

/// Descriptive statistics for a set of measurements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// Number of values.
    pub count: usize,
    /// Mean value.
    pub mean: f64,
    /// Median value.
    pub median: f64,
    /// Standard deviation.
    pub std_dev: f64,
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
    /// 5th percentile.
    pub p5: f64,
    /// 25th percentile.
    pub p25: f64,
    /// 75th percentile.
    pub p75: f64,
    /// 95th percentile.
    pub p95: f64,
}

impl Summary {
    /// Summarize `values`; `None` when there are none.
    ///
    /// `std_dev` is the population standard deviation, matching [`variance`].
    #[must_use]
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let quantile = |q: f64| quantile_sorted(&sorted, q);

        Some(Self {
            count: values.len(),
            mean: mean(values),
            median: quantile(0.5),
            std_dev: variance(values).sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p5: quantile(0.05),
            p25: quantile(0.25),
            p75: quantile(0.75),
            p95: quantile(0.95),
        })
    }
}

//=============================================================================
// Moments
//=============================================================================

/// Arithmetic mean; 0.0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by `n`); 0.0 for an empty slice.
///
/// # Example
///
/// ```
/// use synth_eval::stats::variance;
///
/// let v = variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
/// assert!((v - 4.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / values.len() as f64
}

/// Linearly interpolated quantile of an ascending, non-empty slice.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let last = sorted.len().saturating_sub(1);
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(last);
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_compute() {
        let summary = Summary::compute(&[4.0, 1.0, 3.0, 2.0, 5.0]).unwrap();
        assert_eq!(summary.count, 5);
        assert!((summary.mean - 3.0).abs() < 1e-12);
        assert!((summary.median - 3.0).abs() < 1e-12);
        assert!((summary.std_dev - 2.0f64.sqrt()).abs() < 1e-12);
        assert_eq!((summary.min, summary.max), (1.0, 5.0));
        assert!((summary.p25 - 2.0).abs() < 1e-12);
        assert!((summary.p95 - 4.8).abs() < 1e-12);
    }

    #[test]
    fn test_summary_single_value() {
        let summary = Summary::compute(&[0.25]).unwrap();
        assert_eq!((summary.min, summary.median, summary.p95), (0.25, 0.25, 0.25));
        assert_eq!(summary.std_dev, 0.0);
    }

    #[test]
    fn test_summary_empty() {
        assert!(Summary::compute(&[]).is_none());
    }

    #[test]
    fn test_moments_of_empty_slice() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[]), 0.0);
    }
}
