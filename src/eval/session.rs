//! Evaluation session over a dataset with attached synthetic data.
//!
//! This module provides [`EvalSession`], the main entry point for evaluation.
//! The session encodes the real training split and the synthetic split with
//! the dataset's shared codec, runs the enabled metric families one after
//! another, and handles report generation.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::correlation::{CorrelationDistance, pearson_difference};
use crate::dataset::Dataset;
use crate::distribution::DistributionDistances;
use crate::error::{Error, Result};
use crate::eval::report::{EvaluationReport, MetricFamily, MetricTiming, PrivacyReport};
use crate::privacy::{DEFAULT_PARTITIONS, DEFAULT_THRESHOLD_PERCENT, PrivacyConfig, PrivacyStats};
use crate::stats::Summary;
use crate::table::{ColumnRoles, NumericTable};

/// Which metric families to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Correlation-difference norms and the Pearson difference matrix.
    pub correlation: bool,
    /// Per-column Jensen–Shannon and Wasserstein distances.
    pub distribution: bool,
    /// Hitting rate, identifiability risk, DCR and NNDR.
    pub privacy: bool,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self::all()
    }
}

impl MetricConfig {
    /// Every metric family.
    #[must_use]
    pub fn all() -> Self {
        Self {
            correlation: true,
            distribution: true,
            privacy: true,
        }
    }

    /// Fidelity only: correlation and distribution metrics.
    ///
    /// These scale linearly with row count; use this preset when the
    /// quadratic privacy pass is too slow.
    #[must_use]
    pub fn fidelity() -> Self {
        Self {
            correlation: true,
            distribution: true,
            privacy: false,
        }
    }

    /// Privacy metrics only.
    #[must_use]
    pub fn privacy() -> Self {
        Self {
            correlation: false,
            distribution: false,
            privacy: true,
        }
    }

    /// Whether a family is enabled.
    #[must_use]
    pub fn enabled(&self, family: MetricFamily) -> bool {
        match family {
            MetricFamily::Correlation => self.correlation,
            MetricFamily::Distribution => self.distribution,
            MetricFamily::Privacy => self.privacy,
        }
    }

    /// Enabled families, in evaluation order.
    #[must_use]
    pub fn families(&self) -> Vec<MetricFamily> {
        MetricFamily::ALL
            .into_iter()
            .filter(|f| self.enabled(*f))
            .collect()
    }
}

/// Configuration for an evaluation session.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Directory for report output (CSV, JSON). Only needed by
    /// [`EvalSession::write_report`].
    pub report_dir: Option<PathBuf>,

    /// Privacy pass tuning.
    pub privacy: PrivacyConfig,

    /// Which metrics to calculate.
    pub metrics: MetricConfig,

    /// Overall time budget. Checked before each metric family starts; a
    /// family that has started always runs to completion.
    pub deadline: Option<Duration>,
}

impl EvalConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> EvalConfigBuilder {
        EvalConfigBuilder::default()
    }
}

/// Builder for [`EvalConfig`].
#[derive(Debug, Default)]
pub struct EvalConfigBuilder {
    report_dir: Option<PathBuf>,
    threshold_percent: Option<f64>,
    partitions: Option<usize>,
    metrics: Option<MetricConfig>,
    deadline: Option<Duration>,
}

impl EvalConfigBuilder {
    /// Set the report output directory.
    #[must_use]
    pub fn report_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_dir = Some(path.into());
        self
    }

    /// Set the hit threshold as a fraction of each continuous column's range.
    #[must_use]
    pub fn threshold_percent(mut self, percent: f64) -> Self {
        self.threshold_percent = Some(percent);
        self
    }

    /// Set the number of row partitions for the privacy pass.
    #[must_use]
    pub fn partitions(mut self, partitions: usize) -> Self {
        self.partitions = Some(partitions);
        self
    }

    /// Set which metrics to calculate.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricConfig) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set an overall time budget for [`EvalSession::evaluate`].
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Build the configuration.
    ///
    /// Fails with [`Error::InvalidConfig`] if the threshold is negative or
    /// not finite, or `partitions` is zero.
    pub fn build(self) -> Result<EvalConfig> {
        let privacy = PrivacyConfig {
            threshold_percent: self.threshold_percent.unwrap_or(DEFAULT_THRESHOLD_PERCENT),
            partitions: self.partitions.unwrap_or(DEFAULT_PARTITIONS),
        };
        if privacy.partitions == 0 {
            return Err(Error::InvalidConfig("partitions must be at least 1".to_string()));
        }
        if !privacy.threshold_percent.is_finite() || privacy.threshold_percent < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "threshold_percent must be a non-negative number, got {}",
                privacy.threshold_percent
            )));
        }
        Ok(EvalConfig {
            report_dir: self.report_dir,
            privacy,
            metrics: self.metrics.unwrap_or_default(),
            deadline: self.deadline,
        })
    }
}

/// Evaluation session for synthetic data.
///
/// # Example
///
/// ```rust,ignore
/// use synth_eval::{Dataset, DatasetConfig, EvalConfig, EvalSession};
///
/// let config = DatasetConfig::from_file("adult.json")?;
/// let mut dataset = Dataset::from_config(&config)?;
/// dataset.load_synthetic("ctgan", None)?;
///
/// let session = EvalSession::new(EvalConfig::builder().report_dir("./reports").build()?);
/// let report = session.evaluate(&dataset)?;
/// session.write_report(&report)?;
/// ```
pub struct EvalSession {
    config: EvalConfig,
}

impl EvalSession {
    /// Create a new evaluation session.
    #[must_use]
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    /// The session configuration.
    #[must_use]
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate the dataset's synthetic split against its training split.
    ///
    /// Fails with [`Error::MissingSynthetic`] if no synthetic data is attached.
    pub fn evaluate(&self, dataset: &Dataset) -> Result<EvaluationReport> {
        let (real, synthetic) = dataset.single_encoded_data()?;
        self.evaluate_encoded(dataset.name(), &real, &synthetic, dataset.roles())
    }

    /// Evaluate two tables already encoded with a shared codec.
    ///
    /// Both tables must have the same columns in the same order.
    pub fn evaluate_encoded(
        &self,
        name: &str,
        real: &NumericTable,
        synthetic: &NumericTable,
        roles: &ColumnRoles,
    ) -> Result<EvaluationReport> {
        real.ensure_same_columns(synthetic)?;
        let start = Instant::now();
        let mut report = EvaluationReport::new(name.to_string(), real.n_rows(), synthetic.n_rows());

        tracing::info!(
            dataset = name,
            real_rows = real.n_rows(),
            synthetic_rows = synthetic.n_rows(),
            families = ?self.config.metrics.families(),
            "starting evaluation"
        );

        for family in self.config.metrics.families() {
            if self.config.deadline.is_some_and(|d| start.elapsed() >= d) {
                tracing::warn!(family = family.name(), "deadline passed, skipping");
                report.skipped.push(family);
                continue;
            }

            let family_start = Instant::now();
            match family {
                MetricFamily::Correlation => {
                    report.correlation = Some(CorrelationDistance::compare(real, synthetic, roles)?);
                    report.pearson_difference = Some(pearson_difference(real, synthetic)?);
                }
                MetricFamily::Distribution => {
                    report.distances = Some(DistributionDistances::compute(real, synthetic, roles)?);
                }
                MetricFamily::Privacy => {
                    let stats = PrivacyStats::compute(real, synthetic, roles, &self.config.privacy)?;
                    report.privacy = Some(PrivacyReport {
                        metrics: stats.metrics(),
                        dcr: Summary::compute(&stats.dcr_values()),
                    });
                }
            }
            let elapsed = family_start.elapsed();
            tracing::info!(family = family.name(), elapsed_ms = elapsed.as_millis(), "metric family done");
            report.timings.push(MetricTiming { family, elapsed });
        }

        tracing::info!(
            dataset = name,
            elapsed_ms = start.elapsed().as_millis(),
            skipped = report.skipped.len(),
            "evaluation complete"
        );
        Ok(report)
    }

    /// Write a report to the configured report directory as
    /// `<name>.json` plus a per-column `<name>.csv` distance table.
    ///
    /// Fails with [`Error::InvalidConfig`] when no report directory was set.
    pub fn write_report(&self, report: &EvaluationReport) -> Result<()> {
        let dir = self
            .config
            .report_dir
            .as_deref()
            .ok_or_else(|| Error::InvalidConfig("no report_dir configured".to_string()))?;
        std::fs::create_dir_all(dir)?;

        let json_path = dir.join(format!("{}.json", report.name));
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(json_path, json)?;

        let csv_path = dir.join(format!("{}.csv", report.name));
        self.write_csv_summary(report, &csv_path)?;

        tracing::info!(dir = %dir.display(), name = %report.name, "report written");
        Ok(())
    }

    /// Write the per-column distances as CSV.
    fn write_csv_summary(&self, report: &EvaluationReport, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;

        wtr.write_record(["column", "metric", "distance"])?;

        for d in report.column_distances() {
            let distance = d.distance.map_or(String::new(), |x| format!("{x:.6}"));
            wtr.write_record([d.column.as_str(), d.kind.name(), distance.as_str()])?;
        }

        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use crate::dataset::Split;
    use crate::table::{Column, Table};

    fn roles() -> ColumnRoles {
        ColumnRoles {
            categorical: vec!["c1".to_string(), "c2".to_string()],
            binary: Vec::new(),
            continuous: vec!["x".to_string()],
            label: "y".to_string(),
            has_categorical_schema: true,
        }
    }

    /// 100 rows: two balanced categorical columns shuffled independently and
    /// a continuous column with exactly one value in each bin of width 0.1
    /// over [0, 10).
    fn split(rng: &mut ChaCha8Rng) -> Split {
        let balanced = |rng: &mut ChaCha8Rng| {
            let mut v: Vec<&str> = (0..100).map(|i| if i < 50 { "a" } else { "b" }).collect();
            v.shuffle(rng);
            v
        };
        let c1 = balanced(rng);
        let c2 = balanced(rng);
        let mut x: Vec<f64> = (0..100)
            .map(|i| (f64::from(i) + rng.random_range(0.0..1.0)) / 10.0)
            .collect();
        x.shuffle(rng);
        let y: Vec<&str> = (0..100).map(|i| if i % 2 == 0 { "yes" } else { "no" }).collect();

        Split::new(
            Table::new(vec![
                Column::new("c1", c1),
                Column::new("x", x),
                Column::new("c2", c2),
            ])
            .unwrap(),
            Column::new("y", y),
        )
        .unwrap()
    }

    fn dataset() -> Dataset {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let real = split(&mut rng);
        let synth = split(&mut rng);
        let mut ds = Dataset::builder("same-source", roles()).train(real).build().unwrap();
        ds.set_synthetic(synth.features, synth.labels).unwrap();
        ds
    }

    fn config(dir: &Path) -> EvalConfigBuilder {
        EvalConfig::builder().report_dir(dir)
    }

    #[test]
    fn test_builder_defaults() {
        let config = EvalConfig::builder().report_dir("/tmp/reports").build().unwrap();
        assert_eq!(config.report_dir, Some(PathBuf::from("/tmp/reports")));
        assert!((config.privacy.threshold_percent - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.privacy.partitions, 5);
        assert_eq!(config.metrics, MetricConfig::all());
        assert!(config.deadline.is_none());
    }

    #[test]
    fn test_builder_rejects_invalid() {
        assert!(EvalConfig::builder().build().unwrap().report_dir.is_none());
        assert!(matches!(
            config(Path::new("r")).partitions(0).build(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            config(Path::new("r")).threshold_percent(-1.0).build(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_metric_presets() {
        assert_eq!(
            MetricConfig::fidelity().families(),
            vec![MetricFamily::Correlation, MetricFamily::Distribution]
        );
        assert_eq!(MetricConfig::privacy().families(), vec![MetricFamily::Privacy]);
        assert_eq!(MetricConfig::all().families().len(), 3);
    }

    #[test]
    fn test_same_source_distributions_are_close() {
        let ds = dataset();
        let session = EvalSession::new(
            config(Path::new("unused"))
                .metrics(MetricConfig::fidelity())
                .build()
                .unwrap(),
        );
        let report = session.evaluate(&ds).unwrap();
        assert!(report.is_complete());
        assert!(report.privacy.is_none());

        let distances = report.distances.as_ref().unwrap();
        for column in ["c1", "c2"] {
            assert!(distances.get(column).unwrap() < 0.05, "{column}");
        }
        let x = ds.real_features(crate::dataset::SplitKind::Train).require("x").unwrap();
        let values: Vec<f64> = x.values.iter().filter_map(crate::table::Value::as_f64).collect();
        let std = crate::stats::variance(&values).sqrt();
        assert!(distances.get("x").unwrap() < 0.1 * std);

        let correlation = report.correlation.unwrap();
        assert!(correlation.pearson.is_finite());
        let diff = report.pearson_difference.unwrap();
        assert_eq!(diff.columns, vec!["c1", "x", "c2", "y"]);
        assert_eq!(report.timings.len(), 2);
    }

    #[test]
    fn test_privacy_family_reports_dcr_summary() {
        let ds = dataset();
        let session = EvalSession::new(
            config(Path::new("unused"))
                .metrics(MetricConfig::privacy())
                .partitions(3)
                .build()
                .unwrap(),
        );
        let report = session.evaluate(&ds).unwrap();
        let privacy = report.privacy.unwrap();
        let dcr = privacy.dcr.unwrap();
        assert_eq!(dcr.count, 100);
        assert!((dcr.mean - privacy.metrics.mean_dcr).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&privacy.metrics.nndr));
        assert!((0.0..=1.0).contains(&privacy.metrics.hitting_rate));
        assert!(report.distances.is_none());
    }

    #[test]
    fn test_expired_deadline_skips_every_family() {
        let ds = dataset();
        let session = EvalSession::new(
            config(Path::new("unused"))
                .deadline(Duration::ZERO)
                .build()
                .unwrap(),
        );
        let report = session.evaluate(&ds).unwrap();
        assert_eq!(report.skipped, MetricFamily::ALL.to_vec());
        assert!(report.timings.is_empty());
        assert!(report.correlation.is_none());
        assert!(report.privacy.is_none());
    }

    #[test]
    fn test_evaluate_requires_synthetic() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ds = Dataset::builder("real-only", roles())
            .train(split(&mut rng))
            .build()
            .unwrap();
        let session = EvalSession::new(config(Path::new("unused")).build().unwrap());
        assert!(matches!(session.evaluate(&ds), Err(Error::MissingSynthetic(_))));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let session = EvalSession::new(
            config(dir.path())
                .metrics(MetricConfig::fidelity())
                .build()
                .unwrap(),
        );
        let report = session.evaluate(&dataset()).unwrap();
        session.write_report(&report).unwrap();

        let json = std::fs::read_to_string(dir.path().join("same-source.json")).unwrap();
        let back: EvaluationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.real_rows, 100);

        let mut rdr = csv::Reader::from_path(dir.path().join("same-source.csv")).unwrap();
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, vec!["column", "metric", "distance"]);
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][0], "c1");
        assert_eq!(&rows[0][1], "jensen_shannon");
        assert_eq!(&rows[2][1], "wasserstein");
    }

    #[test]
    fn test_write_report_without_dir() {
        let session = EvalSession::new(
            EvalConfig::builder()
                .metrics(MetricConfig::fidelity())
                .build()
                .unwrap(),
        );
        let report = session.evaluate(&dataset()).unwrap();
        assert!(report.is_complete());
        assert!(matches!(session.write_report(&report), Err(Error::InvalidConfig(_))));
    }
}
