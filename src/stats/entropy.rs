//! Shannon entropy over discrete samples, in nats.

use std::collections::BTreeMap;

/// Map a value to an ordered map key; `-0.0` and `0.0` share a key.
pub(crate) fn key(x: f64) -> u64 {
    if x == 0.0 { 0.0f64.to_bits() } else { x.to_bits() }
}

/// Occurrence counts of each distinct value, sorted by value.
///
/// # Example
///
/// ```
/// use synth_eval::stats::value_counts;
///
/// let counts = value_counts(&[2.0, 1.0, 2.0]);
/// assert_eq!(counts, vec![(1.0, 1), (2.0, 2)]);
/// ```
#[must_use]
pub fn value_counts(values: &[f64]) -> Vec<(f64, usize)> {
    let mut counts: BTreeMap<u64, (f64, usize)> = BTreeMap::new();
    for &x in values {
        counts.entry(key(x)).or_insert((x, 0)).1 += 1;
    }
    let mut out: Vec<(f64, usize)> = counts.into_values().collect();
    out.sort_by(|a, b| a.0.total_cmp(&b.0));
    out
}

/// Shannon entropy (natural log) of a distribution given as counts.
///
/// Zero counts contribute nothing; an all-zero vector has entropy 0.
///
/// # Example
///
/// ```
/// use synth_eval::stats::entropy;
///
/// assert!((entropy(&[5, 5]) - std::f64::consts::LN_2).abs() < 1e-12);
/// assert_eq!(entropy(&[7]), 0.0);
/// ```
#[must_use]
pub fn entropy(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum()
}

/// Entropy of the empirical distribution of `values`.
#[must_use]
pub fn entropy_of(values: &[f64]) -> f64 {
    let counts: Vec<usize> = value_counts(values).into_iter().map(|(_, c)| c).collect();
    entropy(&counts)
}

/// Conditional entropy `H(y | x)` of paired discrete samples.
///
/// `H(y|x) = sum p(x,y) * ln(p(x) / p(x,y))`. The slices must have equal
/// length; extra elements of the longer one are ignored. Terms are summed in
/// key order, so repeated calls give bit-identical results.
#[must_use]
pub fn conditional_entropy(y: &[f64], x: &[f64]) -> f64 {
    let n = y.len().min(x.len());
    if n == 0 {
        return 0.0;
    }
    let mut joint: BTreeMap<(u64, u64), usize> = BTreeMap::new();
    let mut marginal_x: BTreeMap<u64, usize> = BTreeMap::new();
    for (&yi, &xi) in y.iter().zip(x).take(n) {
        *joint.entry((key(xi), key(yi))).or_insert(0) += 1;
        *marginal_x.entry(key(xi)).or_insert(0) += 1;
    }
    let total = n as f64;
    joint
        .iter()
        .map(|(&(kx, _), &c)| {
            let p_xy = c as f64 / total;
            let p_x = marginal_x[&kx] as f64 / total;
            p_xy * (p_x / p_xy).ln()
        })
        .sum()
}
