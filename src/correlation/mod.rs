//! Correlation and association structure of encoded tables.
//!
//! Three matrices describe a table:
//!
//! - [`pearson_matrix`]: linear correlation between continuous columns
//! - [`theils_u_matrix`]: Theil's uncertainty coefficient between categorical
//!   (and binary) columns; asymmetric
//! - [`correlation_ratio_matrix`]: η² of each continuous column grouped by
//!   each categorical column (rows = continuous, columns = categorical)
//!
//! [`CorrelationDistance::compare`] reduces the real-vs-synthetic difference
//! of each matrix to its Frobenius norm, and [`pearson_difference`] keeps the
//! full absolute Pearson difference for column-level inspection.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::matrix::Matrix;
use crate::stats::{conditional_entropy, entropy_of, key, mean};
use crate::table::{ColumnRoles, NumericTable};

//=============================================================================
// Pairwise statistics
//=============================================================================

/// Pearson correlation coefficient of two equally long samples.
///
/// Returns 0.0 when either sample has zero variance.
///
/// # Example
///
/// ```
/// use synth_eval::correlation::pearson;
///
/// let x = [1.0, 2.0, 3.0, 4.0];
/// assert!((pearson(&x, &[2.0, 4.0, 6.0, 8.0]) - 1.0).abs() < 1e-12);
/// assert!((pearson(&x, &[8.0, 6.0, 4.0, 2.0]) + 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = mean(x);
    let my = mean(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

/// Theil's uncertainty coefficient `U(x → y) = (H(y) - H(y|x)) / H(y)`.
///
/// How much knowing `x` reduces uncertainty about `y`, in `[0, 1]`.
/// Defined as 0 when `y` is constant.
///
/// # Example
///
/// ```
/// use synth_eval::correlation::theils_u;
///
/// let x = [0.0, 0.0, 1.0, 1.0, 2.0, 2.0];
/// let y = [0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
/// // x determines y, but y does not determine x
/// assert!((theils_u(&x, &y) - 1.0).abs() < 1e-12);
/// assert!(theils_u(&y, &x) < 1.0);
/// ```
#[must_use]
pub fn theils_u(x: &[f64], y: &[f64]) -> f64 {
    let h_y = entropy_of(y);
    if h_y == 0.0 {
        return 0.0;
    }
    let h_y_given_x = conditional_entropy(y, x);
    ((h_y - h_y_given_x) / h_y).clamp(0.0, 1.0)
}

/// Correlation ratio η² of `measurements` grouped by `categories`.
///
/// Between-group sum of squares over total sum of squares. Returns 0.0 when
/// the between-group term vanishes (including constant measurements).
#[must_use]
pub fn correlation_ratio(categories: &[f64], measurements: &[f64]) -> f64 {
    let n = categories.len().min(measurements.len());
    if n == 0 {
        return 0.0;
    }
    let measurements = &measurements[..n];
    // category key -> (sum, count)
    let mut groups: BTreeMap<u64, (f64, usize)> = BTreeMap::new();
    for (&c, &x) in categories.iter().zip(measurements) {
        let group = groups.entry(key(c)).or_insert((0.0, 0));
        group.0 += x;
        group.1 += 1;
    }
    let total_mean = mean(measurements);
    let numerator: f64 = groups
        .values()
        .map(|&(sum, count)| {
            let group_mean = sum / count as f64;
            count as f64 * (group_mean - total_mean).powi(2)
        })
        .sum();
    if numerator == 0.0 {
        return 0.0;
    }
    let denominator: f64 = measurements.iter().map(|x| (x - total_mean).powi(2)).sum();
    numerator / denominator
}

//=============================================================================
// Matrices
//=============================================================================

fn columns_of(table: &NumericTable, names: &[String]) -> Result<Vec<Vec<f64>>> {
    names.iter().map(|name| table.column(name)).collect()
}

/// Fill a `rows x cols` matrix in parallel from a cell function.
fn par_matrix(rows: usize, cols: usize, cell: impl Fn(usize, usize) -> f64 + Sync) -> Result<Matrix> {
    let data: Vec<f64> = (0..rows * cols)
        .into_par_iter()
        .map(|k| cell(k / cols, k % cols))
        .collect();
    Matrix::from_vec(rows, cols, data)
}

/// Pearson correlation matrix over the named columns.
///
/// The diagonal is 1.0; an empty column list yields [`Matrix::degenerate`].
pub fn pearson_matrix(table: &NumericTable, columns: &[String]) -> Result<Matrix> {
    if columns.is_empty() {
        tracing::warn!("no columns for Pearson correlation, returning degenerate matrix");
        return Ok(Matrix::degenerate());
    }
    let data = columns_of(table, columns)?;
    let k = data.len();
    par_matrix(k, k, |i, j| {
        if i == j { 1.0 } else { pearson(&data[i], &data[j]) }
    })
}

/// Theil's U matrix over the named columns, `m[i][j] = U(i → j)`.
///
/// The diagonal is 1.0; an empty column list yields [`Matrix::degenerate`].
pub fn theils_u_matrix(table: &NumericTable, columns: &[String]) -> Result<Matrix> {
    if columns.is_empty() {
        tracing::warn!("no categorical columns for Theil's U, returning degenerate matrix");
        return Ok(Matrix::degenerate());
    }
    let data = columns_of(table, columns)?;
    let k = data.len();
    par_matrix(k, k, |i, j| {
        if i == j { 1.0 } else { theils_u(&data[i], &data[j]) }
    })
}

/// Correlation ratio matrix, rows = continuous columns, columns = categorical.
///
/// If either column list is empty the result is [`Matrix::degenerate`].
pub fn correlation_ratio_matrix(
    table: &NumericTable,
    continuous: &[String],
    categorical: &[String],
) -> Result<Matrix> {
    if continuous.is_empty() || categorical.is_empty() {
        tracing::warn!(
            continuous = continuous.len(),
            categorical = categorical.len(),
            "empty column set for correlation ratio, returning degenerate matrix"
        );
        return Ok(Matrix::degenerate());
    }
    let measurements = columns_of(table, continuous)?;
    let groups = columns_of(table, categorical)?;
    par_matrix(continuous.len(), categorical.len(), |i, j| {
        correlation_ratio(&groups[j], &measurements[i])
    })
}

/// The three association matrices of one encoded table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrices {
    /// Pearson correlation over continuous columns.
    pub pearson: Matrix,
    /// Theil's U over categorical and binary columns.
    pub theils_u: Matrix,
    /// Correlation ratio, continuous x categorical.
    pub ratio: Matrix,
}

impl CorrelationMatrices {
    /// Compute all three matrices using the column roles to pick subsets.
    pub fn compute(table: &NumericTable, roles: &ColumnRoles) -> Result<Self> {
        let categories = roles.categories();
        Ok(Self {
            pearson: pearson_matrix(table, &roles.continuous)?,
            theils_u: theils_u_matrix(table, &categories)?,
            ratio: correlation_ratio_matrix(table, &roles.continuous, &categories)?,
        })
    }
}

/// Frobenius norms of the real-minus-synthetic correlation matrices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationDistance {
    /// Norm of the Pearson matrix difference.
    pub pearson: f64,
    /// Norm of the Theil's U matrix difference.
    pub theils_u: f64,
    /// Norm of the correlation ratio matrix difference.
    pub ratio: f64,
}

impl CorrelationDistance {
    /// Compare the correlation structure of two encoded tables.
    ///
    /// Both tables must have the same columns in the same order.
    pub fn compare(real: &NumericTable, synthetic: &NumericTable, roles: &ColumnRoles) -> Result<Self> {
        real.ensure_same_columns(synthetic)?;
        tracing::info!(
            continuous = roles.continuous.len(),
            categorical = roles.categories().len(),
            "computing correlation matrices"
        );
        let (real_m, synth_m) = rayon::join(
            || CorrelationMatrices::compute(real, roles),
            || CorrelationMatrices::compute(synthetic, roles),
        );
        let (real_m, synth_m) = (real_m?, synth_m?);
        let distance = Self {
            pearson: real_m.pearson.sub(&synth_m.pearson)?.frobenius_norm(),
            theils_u: real_m.theils_u.sub(&synth_m.theils_u)?.frobenius_norm(),
            ratio: real_m.ratio.sub(&synth_m.ratio)?.frobenius_norm(),
        };
        tracing::info!(
            pearson = distance.pearson,
            theils_u = distance.theils_u,
            ratio = distance.ratio,
            "correlation comparison complete"
        );
        Ok(distance)
    }
}

/// Absolute difference of the full Pearson matrices of two tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PearsonDifference {
    /// Column names indexing both axes.
    pub columns: Vec<String>,
    /// `|corr(real) - corr(synthetic)|`.
    pub matrix: Matrix,
}

impl PearsonDifference {
    /// Column pairs (`i < j`) ordered by decreasing difference.
    #[must_use]
    pub fn largest(&self, n: usize) -> Vec<(String, String, f64)> {
        let k = self.columns.len();
        let mut pairs: Vec<(String, String, f64)> = (0..k)
            .flat_map(|i| (i + 1..k).map(move |j| (i, j)))
            .map(|(i, j)| {
                (
                    self.columns[i].clone(),
                    self.columns[j].clone(),
                    self.matrix.get(i, j),
                )
            })
            .collect();
        pairs.sort_by(|a, b| b.2.total_cmp(&a.2));
        pairs.truncate(n);
        pairs
    }
}

/// Pearson difference over every column of two tables, label included.
pub fn pearson_difference(real: &NumericTable, synthetic: &NumericTable) -> Result<PearsonDifference> {
    real.ensure_same_columns(synthetic)?;
    let columns = real.names().to_vec();
    let (a, b) = rayon::join(
        || pearson_matrix(real, &columns),
        || pearson_matrix(synthetic, &columns),
    );
    Ok(PearsonDifference {
        matrix: a?.sub(&b?)?.abs(),
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    fn roles() -> ColumnRoles {
        ColumnRoles {
            categorical: names(&["c1"]),
            binary: names(&["c2"]),
            continuous: names(&["x", "y"]),
            label: "label".to_string(),
            has_categorical_schema: true,
        }
    }

    fn real_table(rng: &mut ChaCha8Rng, n: usize) -> NumericTable {
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        let mut c1 = Vec::with_capacity(n);
        let mut c2 = Vec::with_capacity(n);
        for _ in 0..n {
            let xi: f64 = rng.random_range(0.0..10.0);
            x.push(xi);
            y.push(2.0 * xi + rng.random_range(-0.5..0.5));
            let ci = f64::from(rng.random_range(0..3u8));
            c1.push(ci);
            c2.push(if ci > 0.0 { 1.0 } else { 0.0 });
        }
        NumericTable::from_columns(vec![
            ("x".to_string(), x),
            ("y".to_string(), y),
            ("c1".to_string(), c1),
            ("c2".to_string(), c2),
        ])
        .unwrap()
    }

    #[test]
    fn test_pearson_zero_variance() {
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(pearson(&[], &[]), 0.0);
    }

    #[test]
    fn test_theils_u_asymmetric() {
        let t = NumericTable::from_columns(vec![
            ("x".to_string(), vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]),
            ("y".to_string(), vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0]),
        ])
        .unwrap();
        let m = theils_u_matrix(&t, &names(&["x", "y"])).unwrap();
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(1, 1), 1.0);
        assert!((m.get(0, 1) - 1.0).abs() < 1e-12);
        let expected = (3.0f64.ln() - 2.0 / 3.0 * 2.0f64.ln()) / 3.0f64.ln();
        assert!((m.get(1, 0) - expected).abs() < 1e-12);
        assert!(!m.is_symmetric(1e-9));
    }

    #[test]
    fn test_theils_u_constant_target() {
        assert_eq!(theils_u(&[0.0, 1.0, 2.0], &[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn test_correlation_ratio_perfect_grouping() {
        let cats = [0.0, 0.0, 1.0, 1.0];
        let values = [1.0, 1.0, 3.0, 3.0];
        assert!((correlation_ratio(&cats, &values) - 1.0).abs() < 1e-12);
        assert_eq!(correlation_ratio(&cats, &[2.0, 2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn test_ratio_matrix_degenerate() {
        let t = NumericTable::from_columns(vec![("x".to_string(), vec![1.0, 2.0])]).unwrap();
        let m = correlation_ratio_matrix(&t, &names(&["x"]), &[]).unwrap();
        assert_eq!(m, Matrix::degenerate());
        let m = correlation_ratio_matrix(&t, &[], &names(&["x"])).unwrap();
        assert_eq!(m.shape(), (1, 1));
        assert_eq!(m.get(0, 0), 0.0);
    }

    #[test]
    fn test_ratio_matrix_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let t = real_table(&mut rng, 50);
        let r = roles();
        let m = correlation_ratio_matrix(&t, &r.continuous, &r.categories()).unwrap();
        assert_eq!(m.shape(), (2, 2));
        assert!(m.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    fn many_categories(rng: &mut ChaCha8Rng, n: usize) -> NumericTable {
        let mut cols: [Vec<f64>; 4] = Default::default();
        for _ in 0..n {
            cols[0].push(rng.random_range(0.0..10.0));
            cols[1].push(rng.random_range(-5.0..5.0));
            cols[2].push(f64::from(rng.random_range(0..40u8)));
            cols[3].push(f64::from(rng.random_range(0..17u8)));
        }
        let [x, y, c1, c2] = cols;
        NumericTable::from_columns(vec![
            ("x".to_string(), x),
            ("y".to_string(), y),
            ("c1".to_string(), c1),
            ("c2".to_string(), c2),
        ])
        .unwrap()
    }

    #[test]
    fn test_theils_u_repeatable() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let t = many_categories(&mut rng, 2000);
        let (c1, c2) = (t.column("c1").unwrap(), t.column("c2").unwrap());
        let first = theils_u(&c1, &c2).to_bits();
        for _ in 0..100 {
            assert_eq!(theils_u(&c1, &c2).to_bits(), first);
        }
        let first = correlation_ratio(&c1, &t.column("x").unwrap()).to_bits();
        for _ in 0..20 {
            assert_eq!(correlation_ratio(&c1, &t.column("x").unwrap()).to_bits(), first);
        }
    }

    #[test]
    fn test_identical_tables_have_zero_distance() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let t = many_categories(&mut rng, 2000);
        for _ in 0..10 {
            let d = CorrelationDistance::compare(&t, &t, &roles()).unwrap();
            assert_eq!(d.pearson, 0.0);
            assert_eq!(d.theils_u, 0.0);
            assert_eq!(d.ratio, 0.0);
        }
        let t = real_table(&mut rng, 80);
        let d = CorrelationDistance::compare(&t, &t, &roles()).unwrap();
        assert_eq!(d.pearson, 0.0);
        assert_eq!(d.theils_u, 0.0);
        assert_eq!(d.ratio, 0.0);
    }

    #[test]
    fn test_shuffled_column_raises_pearson_distance() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let real = real_table(&mut rng, 200);
        let baseline = CorrelationDistance::compare(&real, &real.clone(), &roles()).unwrap();

        let mut y = real.column("y").unwrap();
        y.shuffle(&mut rng);
        let shuffled = NumericTable::from_columns(vec![
            ("x".to_string(), real.column("x").unwrap()),
            ("y".to_string(), y),
            ("c1".to_string(), real.column("c1").unwrap()),
            ("c2".to_string(), real.column("c2").unwrap()),
        ])
        .unwrap();
        let d = CorrelationDistance::compare(&real, &shuffled, &roles()).unwrap();
        assert!(d.pearson > baseline.pearson + 0.5);
        // categorical columns were not touched
        assert!(d.theils_u < 1e-12);
    }

    #[test]
    fn test_pearson_difference_largest() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let real = real_table(&mut rng, 100);
        let mut y = real.column("y").unwrap();
        y.reverse();
        y.shuffle(&mut rng);
        let synth = NumericTable::from_columns(vec![
            ("x".to_string(), real.column("x").unwrap()),
            ("y".to_string(), y),
            ("c1".to_string(), real.column("c1").unwrap()),
            ("c2".to_string(), real.column("c2").unwrap()),
        ])
        .unwrap();
        let diff = pearson_difference(&real, &synth).unwrap();
        assert_eq!(diff.matrix.shape(), (4, 4));
        assert!(diff.matrix.as_slice().iter().all(|v| *v >= 0.0));
        let top = diff.largest(1);
        assert_eq!(top.len(), 1);
        assert_eq!((top[0].0.as_str(), top[0].1.as_str()), ("x", "y"));
    }

    #[test]
    fn test_mismatched_columns_rejected() {
        let a = NumericTable::from_columns(vec![("x".to_string(), vec![1.0])]).unwrap();
        let b = NumericTable::from_columns(vec![("z".to_string(), vec![1.0])]).unwrap();
        assert!(pearson_difference(&a, &b).is_err());
    }
}
