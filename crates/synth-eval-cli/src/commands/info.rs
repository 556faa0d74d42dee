//! Dataset information command.

use std::path::Path;

use anyhow::Result;

pub fn run(config: &Path) -> Result<()> {
    let dataset = super::load_dataset(config)?;
    let info = dataset.info();

    println!("Dataset: {}", info.name);
    println!("{:-<60}", "");
    println!(
        "Train samples: {} ({} train, {} validation)",
        info.train_samples,
        dataset.row_count(),
        info.train_samples - dataset.row_count()
    );
    println!("Test samples: {}", info.test_samples);
    println!("Features: {} continuous, {} categorical", info.continuous, info.categorical);
    println!("Imbalance ratio: {:.2}", info.imbalance);
    println!();
    println!("Classes:");
    for (class, count) in dataset.class_counts() {
        println!("  {:<24} {}", class.to_string(), count);
    }

    Ok(())
}
