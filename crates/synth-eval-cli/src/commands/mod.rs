//! Subcommand implementations.

pub mod correlations;
pub mod evaluate;
pub mod info;

use std::path::Path;

use anyhow::{Context, Result};
use synth_eval::table::read_csv;
use synth_eval::{Dataset, DatasetConfig};

/// Load a dataset from its JSON config.
pub fn load_dataset(config: &Path) -> Result<Dataset> {
    let config = DatasetConfig::from_file(config)
        .with_context(|| format!("Failed to read dataset config {}", config.display()))?;
    Dataset::from_config(&config).with_context(|| format!("Failed to load dataset {}", config.name))
}

/// Load a dataset and attach synthetic features and labels from CSV.
pub fn load_with_synthetic(config: &Path, synthetic_x: &Path, synthetic_y: &Path) -> Result<Dataset> {
    let mut dataset = load_dataset(config)?;

    let features = read_csv(synthetic_x)
        .with_context(|| format!("Failed to read {}", synthetic_x.display()))?;
    let labels_table = read_csv(synthetic_y)
        .with_context(|| format!("Failed to read {}", synthetic_y.display()))?;
    let labels = DatasetConfig::label_column(labels_table, &dataset.roles().label)
        .with_context(|| format!("Failed to find the label column in {}", synthetic_y.display()))?;

    dataset
        .set_synthetic(features, labels)
        .context("Synthetic data does not match the dataset schema")?;
    Ok(dataset)
}
