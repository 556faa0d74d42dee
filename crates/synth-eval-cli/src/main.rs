//! synth-eval CLI - Synthetic tabular data evaluation tool

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

/// Fidelity and privacy evaluation of synthetic tabular data.
#[derive(Parser)]
#[command(name = "synth-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Metric family subsets selectable with `--only`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Only {
    /// Correlation and distribution metrics
    Fidelity,
    /// Privacy metrics
    Privacy,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a synthetic table against the real training split
    Evaluate {
        /// Dataset config (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Synthetic features CSV
        #[arg(long)]
        synthetic_x: PathBuf,

        /// Synthetic labels CSV
        #[arg(long)]
        synthetic_y: PathBuf,

        /// Report directory; the report is printed to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Hit threshold as a fraction of each continuous column's range
        #[arg(long, default_value_t = 0.3)]
        threshold: f64,

        /// Row partitions for the privacy pass
        #[arg(long, default_value_t = 5)]
        partitions: usize,

        /// Only run one group of metrics
        #[arg(long, value_enum)]
        only: Option<Only>,

        /// Stop scheduling metric families after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,
    },

    /// Show dataset information
    Info {
        /// Dataset config (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print the column pairs whose Pearson correlation differs most
    Correlations {
        /// Dataset config (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Synthetic features CSV
        #[arg(long)]
        synthetic_x: PathBuf,

        /// Synthetic labels CSV
        #[arg(long)]
        synthetic_y: PathBuf,

        /// Number of pairs to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Evaluate {
            config,
            synthetic_x,
            synthetic_y,
            output,
            threshold,
            partitions,
            only,
            deadline_secs,
        } => commands::evaluate::run(&commands::evaluate::Args {
            config,
            synthetic_x,
            synthetic_y,
            output,
            threshold,
            partitions,
            only,
            deadline_secs,
        }),
        Commands::Info { config } => commands::info::run(&config),
        Commands::Correlations {
            config,
            synthetic_x,
            synthetic_y,
            top,
        } => commands::correlations::run(&config, &synthetic_x, &synthetic_y, top),
    }
}
