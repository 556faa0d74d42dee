//! Evaluation command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use synth_eval::{EvalConfig, EvalSession, EvaluationReport, MetricConfig};

use crate::Only;

/// Arguments of the `evaluate` subcommand.
pub struct Args {
    pub config: PathBuf,
    pub synthetic_x: PathBuf,
    pub synthetic_y: PathBuf,
    pub output: Option<PathBuf>,
    pub threshold: f64,
    pub partitions: usize,
    pub only: Option<Only>,
    pub deadline_secs: Option<u64>,
}

pub fn run(args: &Args) -> Result<()> {
    let dataset = super::load_with_synthetic(&args.config, &args.synthetic_x, &args.synthetic_y)?;

    let metrics = match args.only {
        None => MetricConfig::all(),
        Some(Only::Fidelity) => MetricConfig::fidelity(),
        Some(Only::Privacy) => MetricConfig::privacy(),
    };
    let mut builder = EvalConfig::builder()
        .threshold_percent(args.threshold)
        .partitions(args.partitions)
        .metrics(metrics);
    if let Some(dir) = &args.output {
        builder = builder.report_dir(dir);
    }
    if let Some(secs) = args.deadline_secs {
        builder = builder.deadline(Duration::from_secs(secs));
    }
    let session = EvalSession::new(builder.build().context("Invalid evaluation settings")?);
    tracing::debug!(config = ?session.config(), "evaluation settings");

    let report = session
        .evaluate(&dataset)
        .with_context(|| format!("Failed to evaluate {}", dataset.name()))?;

    match &args.output {
        Some(dir) => {
            session
                .write_report(&report)
                .with_context(|| format!("Failed to write report to {}", dir.display()))?;
            print_summary(&report);
            println!();
            println!("Report written to {}", dir.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

fn print_summary(report: &EvaluationReport) {
    println!(
        "Dataset: {} ({} real rows, {} synthetic rows)",
        report.name, report.real_rows, report.synthetic_rows
    );
    println!("{:-<60}", "");

    if let Some(c) = &report.correlation {
        println!("Correlation difference (Frobenius norm):");
        println!("  Pearson: {:.4}, Theil's U: {:.4}, Ratio: {:.4}", c.pearson, c.theils_u, c.ratio);
    }

    if let Some(p) = &report.privacy {
        let m = &p.metrics;
        println!("Privacy:");
        println!("  Hitting rate: {:.4}", m.hitting_rate);
        println!("  Epsilon identifiability risk: {:.4}", m.epsilon_identifiability_risk);
        println!("  Mean DCR: {:.4}, NNDR: {:.4}", m.mean_dcr, m.nndr);
    }

    if report.distances.is_some() {
        println!("Column distances:");
        for d in report.column_distances() {
            let value = d.distance.map_or_else(|| "undefined".to_string(), |x| format!("{x:.4}"));
            println!("  {:<24} {:<16} {}", d.column, d.kind.name(), value);
        }
    }

    for family in &report.skipped {
        println!("Skipped (deadline): {}", family.name());
    }
}
