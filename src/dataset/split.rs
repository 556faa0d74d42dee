//! Seeded stratified train/validation splitting.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, Result};
use crate::table::Value;

/// Row indices of a two-way split, each in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    /// Rows kept for training.
    pub train: Vec<usize>,
    /// Rows held out for validation.
    pub validation: Vec<usize>,
}

/// Split rows so every class keeps its share in both parts.
///
/// Each class gives `round(len * val_size)` of its rows to validation, but
/// always keeps at least one row in train. Rows are drawn with a ChaCha8 RNG
/// seeded from `seed`, so the split is reproducible.
///
/// # Example
///
/// ```
/// use synth_eval::dataset::stratified_split;
/// use synth_eval::table::Value;
///
/// let labels: Vec<Value> = (0..10).map(|i| Value::Number(f64::from(i % 2))).collect();
/// let split = stratified_split(&labels, 0.2, 42).unwrap();
/// assert_eq!(split.train.len(), 8);
/// assert_eq!(split.validation.len(), 2);
/// ```
pub fn stratified_split(labels: &[Value], val_size: f64, seed: u64) -> Result<SplitIndices> {
    if !(0.0..1.0).contains(&val_size) {
        return Err(Error::InvalidConfig(format!(
            "val_size must be in [0, 1), got {val_size}"
        )));
    }

    let mut groups: BTreeMap<&Value, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(i);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut validation = Vec::new();
    for mut indices in groups.into_values() {
        indices.shuffle(&mut rng);
        let n_val = ((indices.len() as f64 * val_size).round() as usize).min(indices.len() - 1);
        validation.extend_from_slice(&indices[..n_val]);
        train.extend_from_slice(&indices[n_val..]);
    }
    train.sort_unstable();
    validation.sort_unstable();

    tracing::debug!(
        train = train.len(),
        validation = validation.len(),
        seed,
        "stratified split"
    );
    Ok(SplitIndices { train, validation })
}
