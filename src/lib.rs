//! # synth-eval
//!
//! Fidelity and privacy evaluation of synthetic tabular data.
//!
//! A [`Dataset`] holds real train/validation/test splits of a mixed
//! categorical/continuous table plus an externally generated synthetic split.
//! Both are encoded with one shared [`codec::CategoricalCodec`] and handed to
//! the metric engines, which compare the synthetic rows against the real
//! training rows.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use synth_eval::{Dataset, DatasetConfig, EvalConfig, EvalSession, MetricConfig};
//!
//! let config = DatasetConfig::from_file("datasets/adult.json")?;
//! let mut dataset = Dataset::from_config(&config)?;
//! dataset.load_synthetic("ctgan", None)?;
//!
//! let session = EvalSession::new(
//!     EvalConfig::builder()
//!         .report_dir("./reports")
//!         .metrics(MetricConfig::all())
//!         .build()?,
//! );
//! let report = session.evaluate(&dataset)?;
//! session.write_report(&report)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`table`]: Tabular data model and CSV import/export
//! - [`matrix`]: Dense `f64` matrix
//! - [`codec`]: Categorical, label and feature encoding
//! - [`stats`]: Descriptive statistics and entropy
//! - [`correlation`]: Pearson, Theil's U and correlation ratio
//! - [`privacy`]: Nearest-neighbour privacy metrics
//! - [`distribution`]: Jensen–Shannon and Wasserstein distances
//! - [`dataset`]: Dataset container, configuration and synthetic persistence
//! - [`eval`]: Evaluation session and report generation

pub mod codec;
pub mod correlation;
pub mod dataset;
pub mod distribution;
pub mod error;
pub mod eval;
pub mod matrix;
pub mod privacy;
pub mod stats;
pub mod table;

// Re-export commonly used types
pub use codec::{CategoricalCodec, FeatureEncoder, ImputePolicy, LabelEncoder, UnknownCategoryPolicy};
pub use correlation::{CorrelationDistance, PearsonDifference};
pub use dataset::{Dataset, DatasetConfig, DatasetInfo, Split, SplitKind};
pub use distribution::{ColumnDistance, DistanceKind, DistributionDistances};
pub use error::{Error, Result};
pub use eval::{EvalConfig, EvalSession, EvaluationReport, MetricConfig, MetricFamily};
pub use matrix::Matrix;
pub use privacy::{PrivacyConfig, PrivacyMetrics, PrivacyStats};
pub use stats::Summary;
pub use table::{Column, ColumnRole, ColumnRoles, NumericTable, Table, Value};
