//! Pearson difference command.

use std::path::Path;

use anyhow::{Context, Result, bail};
use synth_eval::correlation::pearson_difference;

pub fn run(config: &Path, synthetic_x: &Path, synthetic_y: &Path, top: usize) -> Result<()> {
    if top == 0 {
        bail!("--top must be at least 1");
    }
    let dataset = super::load_with_synthetic(config, synthetic_x, synthetic_y)?;
    let (real, synthetic) = dataset
        .single_encoded_data()
        .context("Failed to encode real and synthetic data")?;
    let diff = pearson_difference(&real, &synthetic)?;

    println!("Largest Pearson differences ({}):", dataset.name());
    println!("{:-<60}", "");
    for (a, b, d) in diff.largest(top) {
        println!("  {:<20} {:<20} {:.4}", a, b, d);
    }

    Ok(())
}
