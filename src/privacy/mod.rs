//! Nearest-neighbour privacy metrics between real and synthetic records.
//!
//! All metrics are derived from one pass over the encoded (not normalized)
//! tables, computed by [`PrivacyStats::compute`]:
//!
//! - per synthetic row: the two smallest unweighted distances to the real set
//!   (distance to closest record and its runner-up)
//! - per real row: whether some synthetic row matches it within per-column
//!   thresholds (a *hit*), the smallest entropy-weighted distance to the
//!   synthetic set, and the smallest weighted distance to another real row
//!
//! The pass is O(n·m·p). Rows are split into [`PrivacyConfig::partitions`]
//! contiguous chunks evaluated in parallel with rayon; chunks share only the
//! read-only input matrices, weights and thresholds.
//!
//! ## Example
//!
//! ```rust,ignore
//! use synth_eval::privacy::{PrivacyConfig, PrivacyStats};
//!
//! let stats = PrivacyStats::compute(&real, &synthetic, &roles, &PrivacyConfig::default())?;
//! let metrics = stats.metrics();
//! println!("hitting rate {:.3}, NNDR {:.3}", metrics.hitting_rate, metrics.nndr);
//! ```

use std::ops::Range;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::stats::entropy_of;
use crate::table::{ColumnRoles, NumericTable};

/// Default fraction of a column's range within which values count as a match.
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 0.3;

/// Default number of row partitions processed in parallel.
pub const DEFAULT_PARTITIONS: usize = 5;

/// Tuning for the privacy pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrivacyConfig {
    /// Fraction of each continuous column's real range used as hit threshold.
    pub threshold_percent: f64,
    /// Number of row chunks evaluated in parallel.
    pub partitions: usize,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            threshold_percent: DEFAULT_THRESHOLD_PERCENT,
            partitions: DEFAULT_PARTITIONS,
        }
    }
}

impl PrivacyConfig {
    fn validate(&self) -> Result<()> {
        if self.partitions == 0 {
            return Err(Error::InvalidConfig("partitions must be at least 1".to_string()));
        }
        if !self.threshold_percent.is_finite() || self.threshold_percent < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "threshold_percent must be a non-negative number, got {}",
                self.threshold_percent
            )));
        }
        Ok(())
    }
}

//=============================================================================
// Building blocks
//=============================================================================

/// Entropy (nats) of each column after rounding values to integers.
///
/// Rounding is half-to-even. Higher-entropy columns get larger weights and
/// therefore contribute less to weighted distances.
///
/// # Example
///
/// ```
/// use synth_eval::Matrix;
/// use synth_eval::privacy::entropy_weights;
///
/// let m = Matrix::from_rows(&[vec![0.4, 7.0], vec![0.6, 7.0]]).unwrap();
/// let w = entropy_weights(&m);
/// assert!((w[0] - std::f64::consts::LN_2).abs() < 1e-12);
/// assert_eq!(w[1], 0.0);
/// ```
#[must_use]
pub fn entropy_weights(data: &Matrix) -> Vec<f64> {
    (0..data.cols())
        .map(|j| {
            let rounded: Vec<f64> = data.column(j).into_iter().map(f64::round_ties_even).collect();
            entropy_of(&rounded)
        })
        .collect()
}

/// Euclidean distance from `row` to every row of `candidates`.
///
/// With weights, each column difference is divided by its weight first;
/// columns whose weight is zero are left out of the sum.
#[must_use]
pub fn euclidean_distances(row: &[f64], candidates: &Matrix, weights: Option<&[f64]>) -> Vec<f64> {
    candidates
        .iter_rows()
        .map(|other| weighted_distance(row, other, weights))
        .collect()
}

fn weighted_distance(a: &[f64], b: &[f64], weights: Option<&[f64]>) -> f64 {
    let sum: f64 = match weights {
        None => a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum(),
        Some(w) => a
            .iter()
            .zip(b)
            .zip(w)
            .filter(|(_, w)| **w != 0.0)
            .map(|((x, y), w)| ((x - y) / w).powi(2))
            .sum(),
    };
    sum.sqrt()
}

/// Per-column hit thresholds: `percent * (max - min)` of the real data, and
/// zero for categorical, binary and label columns (exact match required).
#[must_use]
pub fn hit_thresholds(real: &NumericTable, roles: &ColumnRoles, percent: f64) -> Vec<f64> {
    let min = real.matrix().column_min();
    let max = real.matrix().column_max();
    real.names()
        .iter()
        .zip(min.iter().zip(&max))
        .map(|(name, (lo, hi))| {
            if roles.is_category(name) || *name == roles.label {
                0.0
            } else {
                percent * (hi - lo)
            }
        })
        .collect()
}

/// The two smallest values, ordered so that `first <= second`.
///
/// Ties keep the earlier element first. Needs at least two values.
fn two_smallest(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let mut first = f64::INFINITY;
    let mut second = f64::INFINITY;
    for d in values {
        if d < first {
            second = first;
            first = d;
        } else if d < second {
            second = d;
        }
    }
    (first, second)
}

fn partition_ranges(n: usize, partitions: usize) -> Vec<Range<usize>> {
    let chunk = n.div_ceil(partitions.max(1)).max(1);
    (0..n).step_by(chunk).map(|start| start..(start + chunk).min(n)).collect()
}

/// Apply `f` to every row index in parallel chunks, keeping row order.
fn map_partitioned<T: Send>(n: usize, partitions: usize, f: impl Fn(usize) -> T + Sync) -> Vec<T> {
    partition_ranges(n, partitions)
        .into_par_iter()
        .map(|range| range.map(&f).collect::<Vec<T>>())
        .collect::<Vec<Vec<T>>>()
        .into_iter()
        .flatten()
        .collect()
}

//=============================================================================
// Per-row statistics
//=============================================================================

/// Distances from one synthetic row to its two nearest real rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticRowDistance {
    /// Distance to the closest real record.
    pub first: f64,
    /// Distance to the second closest real record.
    pub second: f64,
}

impl SyntheticRowDistance {
    /// `first / second`, in `[0, 1]`; 0 when both neighbours coincide with
    /// the row.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.second == 0.0 { 0.0 } else { self.first / self.second }
    }
}

/// Risk statistics for one real row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealRowRisk {
    /// Some synthetic row lies within the threshold on every column.
    pub hit: bool,
    /// Smallest weighted distance to a synthetic row.
    pub fake_distance_min: f64,
    /// Smallest weighted distance to another real row.
    pub min_real_dist: f64,
}

/// Per-row results of the privacy pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyStats {
    /// One entry per synthetic row.
    pub synthetic: Vec<SyntheticRowDistance>,
    /// One entry per real row.
    pub real: Vec<RealRowRisk>,
}

impl PrivacyStats {
    /// Run the distance and hit pass over two encoded tables.
    ///
    /// Both tables must have the same columns in the same order. The real
    /// table needs at least two rows and the synthetic table at least one.
    pub fn compute(
        real: &NumericTable,
        synthetic: &NumericTable,
        roles: &ColumnRoles,
        config: &PrivacyConfig,
    ) -> Result<Self> {
        config.validate()?;
        real.ensure_same_columns(synthetic)?;
        if real.n_rows() < 2 {
            return Err(Error::InsufficientRows {
                what: "real table".to_string(),
                required: 2,
                actual: real.n_rows(),
            });
        }
        if synthetic.n_rows() < 1 {
            return Err(Error::InsufficientRows {
                what: "synthetic table".to_string(),
                required: 1,
                actual: synthetic.n_rows(),
            });
        }

        let real_m = real.matrix();
        let fake_m = synthetic.matrix();
        let thresholds = hit_thresholds(real, roles, config.threshold_percent);
        let weights = entropy_weights(real_m);

        tracing::info!(
            real_rows = real_m.rows(),
            synthetic_rows = fake_m.rows(),
            columns = real_m.cols(),
            partitions = config.partitions,
            "computing distances and hits"
        );
        tracing::debug!(?weights, ?thresholds, "privacy pass inputs");

        let synthetic_stats = map_partitioned(fake_m.rows(), config.partitions, |i| {
            let row = fake_m.row(i);
            let (first, second) =
                two_smallest(real_m.iter_rows().map(|other| weighted_distance(row, other, None)));
            SyntheticRowDistance { first, second }
        });

        let real_stats = map_partitioned(real_m.rows(), config.partitions, |i| {
            let row = real_m.row(i);
            let mut hit = false;
            let mut fake_distance_min = f64::INFINITY;
            for other in fake_m.iter_rows() {
                hit = hit
                    || row
                        .iter()
                        .zip(other)
                        .zip(&thresholds)
                        .all(|((a, b), t)| (a - b).abs() <= *t);
                fake_distance_min = fake_distance_min.min(weighted_distance(row, other, Some(&weights)));
            }
            let (_, min_real_dist) = two_smallest(
                real_m
                    .iter_rows()
                    .map(|other| weighted_distance(row, other, Some(&weights))),
            );
            RealRowRisk {
                hit,
                fake_distance_min,
                min_real_dist,
            }
        });

        tracing::info!("distances and hits complete");
        Ok(Self {
            synthetic: synthetic_stats,
            real: real_stats,
        })
    }

    /// Fraction of real rows with a hit.
    #[must_use]
    pub fn hitting_rate(&self) -> f64 {
        if self.real.is_empty() {
            return 0.0;
        }
        self.real.iter().filter(|r| r.hit).count() as f64 / self.real.len() as f64
    }

    /// Fraction of real rows closer to a synthetic row than to any other
    /// real row.
    #[must_use]
    pub fn epsilon_identifiability_risk(&self) -> f64 {
        if self.real.is_empty() {
            return 0.0;
        }
        self.real
            .iter()
            .filter(|r| r.fake_distance_min < r.min_real_dist)
            .count() as f64
            / self.real.len() as f64
    }

    /// Mean distance from each synthetic row to its closest real row.
    #[must_use]
    pub fn mean_distance_to_closest_record(&self) -> f64 {
        crate::stats::mean(&self.dcr_values())
    }

    /// Mean over synthetic rows of nearest / second-nearest real distance.
    #[must_use]
    pub fn nearest_neighbor_distance_ratio(&self) -> f64 {
        let ratios: Vec<f64> = self.synthetic.iter().map(SyntheticRowDistance::ratio).collect();
        crate::stats::mean(&ratios)
    }

    /// Distance to closest record of every synthetic row.
    #[must_use]
    pub fn dcr_values(&self) -> Vec<f64> {
        self.synthetic.iter().map(|s| s.first).collect()
    }

    /// All scalar privacy metrics.
    #[must_use]
    pub fn metrics(&self) -> PrivacyMetrics {
        PrivacyMetrics {
            hitting_rate: self.hitting_rate(),
            epsilon_identifiability_risk: self.epsilon_identifiability_risk(),
            mean_dcr: self.mean_distance_to_closest_record(),
            nndr: self.nearest_neighbor_distance_ratio(),
        }
    }
}

/// Scalar privacy metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrivacyMetrics {
    /// Fraction of real rows with a near-exact synthetic match.
    pub hitting_rate: f64,
    /// Fraction of real rows closer to the synthetic set than to other real rows.
    pub epsilon_identifiability_risk: f64,
    /// Mean distance to closest record.
    pub mean_dcr: f64,
    /// Mean nearest-neighbour distance ratio.
    pub nndr: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn roles() -> ColumnRoles {
        ColumnRoles {
            categorical: vec!["c".to_string()],
            binary: vec![],
            continuous: vec!["x".to_string(), "z".to_string()],
            label: "label".to_string(),
            has_categorical_schema: true,
        }
    }

    fn random_table(rng: &mut ChaCha8Rng, n: usize, offset: f64) -> NumericTable {
        let mut x = Vec::new();
        let mut z = Vec::new();
        let mut c = Vec::new();
        let mut label = Vec::new();
        for _ in 0..n {
            x.push(offset + rng.random_range(0.0..10.0));
            z.push(offset + rng.random_range(-5.0..5.0));
            c.push(f64::from(rng.random_range(0..4u8)));
            label.push(f64::from(rng.random_range(0..2u8)));
        }
        NumericTable::from_columns(vec![
            ("x".to_string(), x),
            ("z".to_string(), z),
            ("c".to_string(), c),
            ("label".to_string(), label),
        ])
        .unwrap()
    }

    #[test]
    fn test_exact_copy() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let real = random_table(&mut rng, 60, 0.0);
        let stats = PrivacyStats::compute(&real, &real.clone(), &roles(), &PrivacyConfig::default()).unwrap();
        let m = stats.metrics();
        assert_eq!(m.mean_dcr, 0.0);
        assert_eq!(m.hitting_rate, 1.0);
        assert_eq!(m.nndr, 0.0);
    }

    #[test]
    fn test_metrics_in_unit_interval() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let real = random_table(&mut rng, 80, 0.0);
        let synth = random_table(&mut rng, 50, 0.0);
        let config = PrivacyConfig {
            threshold_percent: 0.3,
            partitions: 3,
        };
        let stats = PrivacyStats::compute(&real, &synth, &roles(), &config).unwrap();
        assert_eq!(stats.real.len(), 80);
        assert_eq!(stats.synthetic.len(), 50);
        let m = stats.metrics();
        assert!((0.0..=1.0).contains(&m.hitting_rate));
        assert!((0.0..=1.0).contains(&m.epsilon_identifiability_risk));
        for s in &stats.synthetic {
            assert!(s.first <= s.second);
            assert!((0.0..=1.0).contains(&s.ratio()));
        }
    }

    #[test]
    fn test_well_separated_supports() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let real = random_table(&mut rng, 40, 0.0);
        let synth = random_table(&mut rng, 40, 1000.0);
        let stats = PrivacyStats::compute(&real, &synth, &roles(), &PrivacyConfig::default()).unwrap();
        assert_eq!(stats.epsilon_identifiability_risk(), 0.0);
        assert_eq!(stats.hitting_rate(), 0.0);
    }

    #[test]
    fn test_partitioning_does_not_change_results() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let real = random_table(&mut rng, 33, 0.0);
        let synth = random_table(&mut rng, 17, 0.5);
        let one = PrivacyStats::compute(
            &real,
            &synth,
            &roles(),
            &PrivacyConfig {
                partitions: 1,
                ..PrivacyConfig::default()
            },
        )
        .unwrap();
        let many = PrivacyStats::compute(
            &real,
            &synth,
            &roles(),
            &PrivacyConfig {
                partitions: 8,
                ..PrivacyConfig::default()
            },
        )
        .unwrap();
        assert_eq!(one, many);
    }

    #[test]
    fn test_insufficient_rows() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let one_row = random_table(&mut rng, 1, 0.0);
        let other = random_table(&mut rng, 5, 0.0);
        assert!(matches!(
            PrivacyStats::compute(&one_row, &other, &roles(), &PrivacyConfig::default()),
            Err(Error::InsufficientRows { required: 2, .. })
        ));
    }

    #[test]
    fn test_zero_partitions_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let t = random_table(&mut rng, 5, 0.0);
        let config = PrivacyConfig {
            partitions: 0,
            ..PrivacyConfig::default()
        };
        assert!(matches!(
            PrivacyStats::compute(&t, &t, &roles(), &config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_hit_thresholds_zero_for_categories_and_label() {
        let t = NumericTable::from_columns(vec![
            ("x".to_string(), vec![0.0, 10.0]),
            ("z".to_string(), vec![-1.0, 1.0]),
            ("c".to_string(), vec![0.0, 3.0]),
            ("label".to_string(), vec![0.0, 1.0]),
        ])
        .unwrap();
        let thresholds = hit_thresholds(&t, &roles(), 0.3);
        assert!((thresholds[0] - 3.0).abs() < 1e-12);
        assert!((thresholds[1] - 0.6).abs() < 1e-12);
        assert_eq!(&thresholds[2..], &[0.0, 0.0]);
    }

    #[test]
    fn test_weighted_distance_skips_zero_weights() {
        let m = Matrix::from_rows(&[vec![3.0, 100.0]]).unwrap();
        let d = euclidean_distances(&[0.0, 0.0], &m, Some(&[1.5, 0.0]));
        assert!((d[0] - 2.0).abs() < 1e-12);
        let d = euclidean_distances(&[0.0, 96.0], &m, None);
        assert!((d[0] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_entropy_weights_round_half_even() {
        // 0.5 -> 0, 1.5 -> 2, 2.5 -> 2
        let m = Matrix::from_rows(&[vec![0.5], vec![1.5], vec![2.5], vec![0.0]]).unwrap();
        let w = entropy_weights(&m);
        assert!((w[0] - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn test_partition_ranges_cover_rows() {
        assert_eq!(partition_ranges(10, 3), vec![0..4, 4..8, 8..10]);
        assert_eq!(partition_ranges(2, 5), vec![0..1, 1..2]);
        assert!(partition_ranges(0, 5).is_empty());
    }
}
