//! Per-column distances between real and synthetic marginal distributions.
//!
//! Categorical and binary columns are compared with the Jensen–Shannon
//! distance over their value counts; continuous columns with the 1-D
//! Wasserstein (earth mover's) distance. A distance is `None` when it is
//! undefined: either side has no rows, or the column holds one and the same
//! constant in both tables.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stats::value_counts;
use crate::table::{ColumnRoles, NumericTable};

/// Jensen–Shannon distance (natural log) between the empirical distributions
/// of two discrete samples.
///
/// The result lies in `[0, sqrt(ln 2)]`.
///
/// # Example
///
/// ```
/// use synth_eval::distribution::jensen_shannon_distance;
///
/// let d = jensen_shannon_distance(&[0.0, 1.0, 1.0], &[1.0, 0.0, 1.0]).unwrap();
/// assert!(d.abs() < 1e-12);
/// let d = jensen_shannon_distance(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
/// assert!((d - std::f64::consts::LN_2.sqrt()).abs() < 1e-12);
/// ```
#[must_use]
pub fn jensen_shannon_distance(real: &[f64], synthetic: &[f64]) -> Option<f64> {
    if is_undefined(real, synthetic) {
        return None;
    }
    let p_counts = value_counts(real);
    let q_counts = value_counts(synthetic);
    let n_p = real.len() as f64;
    let n_q = synthetic.len() as f64;

    // Merge the two sorted count lists over the union of values.
    let (mut i, mut j) = (0, 0);
    let mut divergence = 0.0;
    while i < p_counts.len() || j < q_counts.len() {
        let (p, q) = match (p_counts.get(i), q_counts.get(j)) {
            (Some(&(a, ca)), Some(&(b, cb))) if a == b => {
                i += 1;
                j += 1;
                (ca as f64 / n_p, cb as f64 / n_q)
            }
            (Some(&(a, ca)), Some(&(b, _))) if a < b => {
                i += 1;
                (ca as f64 / n_p, 0.0)
            }
            (Some(&(_, ca)), None) => {
                i += 1;
                (ca as f64 / n_p, 0.0)
            }
            (_, Some(&(_, cb))) => {
                j += 1;
                (0.0, cb as f64 / n_q)
            }
            (None, None) => break,
        };
        let m = (p + q) / 2.0;
        if p > 0.0 {
            divergence += 0.5 * p * (p / m).ln();
        }
        if q > 0.0 {
            divergence += 0.5 * q * (q / m).ln();
        }
    }
    Some(divergence.max(0.0).sqrt())
}

/// First Wasserstein distance between two 1-D empirical distributions.
///
/// Integrates the absolute difference of the two empirical CDFs.
///
/// # Example
///
/// ```
/// use synth_eval::distribution::wasserstein_distance;
///
/// let d = wasserstein_distance(&[0.0, 1.0, 3.0], &[5.0, 6.0, 8.0]).unwrap();
/// assert!((d - 5.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn wasserstein_distance(real: &[f64], synthetic: &[f64]) -> Option<f64> {
    if is_undefined(real, synthetic) {
        return None;
    }
    let mut u = real.to_vec();
    let mut v = synthetic.to_vec();
    u.sort_by(f64::total_cmp);
    v.sort_by(f64::total_cmp);
    let mut all: Vec<f64> = u.iter().chain(&v).copied().collect();
    all.sort_by(f64::total_cmp);

    let n_u = u.len() as f64;
    let n_v = v.len() as f64;
    let (mut iu, mut iv) = (0, 0);
    let mut total = 0.0;
    for window in all.windows(2) {
        let x = window[0];
        while iu < u.len() && u[iu] <= x {
            iu += 1;
        }
        while iv < v.len() && v[iv] <= x {
            iv += 1;
        }
        let delta = window[1] - x;
        total += (iu as f64 / n_u - iv as f64 / n_v).abs() * delta;
    }
    Some(total)
}

fn is_undefined(real: &[f64], synthetic: &[f64]) -> bool {
    if real.is_empty() || synthetic.is_empty() {
        return true;
    }
    let first = real[0];
    real.iter().chain(synthetic).all(|&x| x == first)
}

/// Which distance a [`ColumnDistance`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceKind {
    /// Jensen–Shannon distance of a categorical or binary column.
    JensenShannon,
    /// Wasserstein distance of a continuous column.
    Wasserstein,
}

impl DistanceKind {
    /// Short name used in reports.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::JensenShannon => "jensen_shannon",
            Self::Wasserstein => "wasserstein",
        }
    }
}

/// Distance between the real and synthetic marginals of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDistance {
    /// Column name.
    pub column: String,
    /// Distance used.
    pub kind: DistanceKind,
    /// The distance, or `None` when undefined.
    pub distance: Option<f64>,
}

/// Per-column distances for a whole table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionDistances {
    /// Jensen–Shannon distance of every categorical and binary column.
    pub jensen_shannon: Vec<ColumnDistance>,
    /// Wasserstein distance of every continuous column.
    pub wasserstein: Vec<ColumnDistance>,
}

impl DistributionDistances {
    /// Compute distances for every feature column of two encoded tables.
    pub fn compute(real: &NumericTable, synthetic: &NumericTable, roles: &ColumnRoles) -> Result<Self> {
        real.ensure_same_columns(synthetic)?;
        tracing::info!("computing Jensen-Shannon and Wasserstein distances");
        let jensen_shannon = per_column(real, synthetic, &roles.categories(), DistanceKind::JensenShannon)?;
        let wasserstein = per_column(real, synthetic, &roles.continuous, DistanceKind::Wasserstein)?;
        let undefined = jensen_shannon
            .iter()
            .chain(&wasserstein)
            .filter(|d| d.distance.is_none())
            .count();
        if undefined > 0 {
            tracing::warn!(undefined, "some column distances are undefined");
        }
        Ok(Self {
            jensen_shannon,
            wasserstein,
        })
    }

    /// All column distances, Jensen–Shannon first.
    pub fn iter(&self) -> impl Iterator<Item = &ColumnDistance> {
        self.jensen_shannon.iter().chain(&self.wasserstein)
    }

    /// Distance for a column, if it was computed and is defined.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.iter().find(|d| d.column == column).and_then(|d| d.distance)
    }
}

fn per_column(
    real: &NumericTable,
    synthetic: &NumericTable,
    columns: &[String],
    kind: DistanceKind,
) -> Result<Vec<ColumnDistance>> {
    columns
        .par_iter()
        .map(|name| {
            let a = real.column(name)?;
            let b = synthetic.column(name)?;
            let distance = match kind {
                DistanceKind::JensenShannon => jensen_shannon_distance(&a, &b),
                DistanceKind::Wasserstein => wasserstein_distance(&a, &b),
            };
            Ok(ColumnDistance {
                column: name.clone(),
                kind,
                distance,
            })
        })
        .collect()
}
