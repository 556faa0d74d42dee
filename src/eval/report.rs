//! Report types for evaluation results.
//!
//! An [`EvaluationReport`] is what [`EvalSession::evaluate`](super::EvalSession::evaluate)
//! returns. It serializes to JSON as-is; the per-column distances can also be
//! written as a CSV table.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::correlation::{CorrelationDistance, PearsonDifference};
use crate::distribution::{ColumnDistance, DistributionDistances};
use crate::privacy::PrivacyMetrics;
use crate::stats::Summary;

/// A group of metrics that is scheduled (or skipped) as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFamily {
    /// Pearson / Theil's U / correlation-ratio differences.
    Correlation,
    /// Jensen–Shannon and Wasserstein distances.
    Distribution,
    /// Hitting rate, identifiability risk, DCR and NNDR.
    Privacy,
}

impl MetricFamily {
    /// Every family, in evaluation order.
    pub const ALL: [Self; 3] = [Self::Correlation, Self::Distribution, Self::Privacy];

    /// Short name used in logs and CLI flags.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Correlation => "correlation",
            Self::Distribution => "distribution",
            Self::Privacy => "privacy",
        }
    }
}

/// Wall-clock time spent on one metric family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricTiming {
    /// The family that ran.
    pub family: MetricFamily,

    /// Elapsed time.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

/// Privacy metrics together with the distribution of per-row DCR values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyReport {
    /// Scalar privacy metrics.
    pub metrics: PrivacyMetrics,

    /// Summary of distance to closest record over synthetic rows.
    pub dcr: Option<Summary>,
}

/// Fidelity and privacy of one synthetic table against its real counterpart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Dataset name; also the report file stem.
    pub name: String,

    /// Rows in the real (training) table.
    pub real_rows: usize,

    /// Rows in the synthetic table.
    pub synthetic_rows: usize,

    /// Frobenius norms of the correlation matrix differences.
    pub correlation: Option<CorrelationDistance>,

    /// Absolute Pearson difference over all columns.
    pub pearson_difference: Option<PearsonDifference>,

    /// Privacy metrics.
    pub privacy: Option<PrivacyReport>,

    /// Per-column marginal distances.
    pub distances: Option<DistributionDistances>,

    /// Time spent per family that ran.
    pub timings: Vec<MetricTiming>,

    /// Families not run because the deadline had passed.
    pub skipped: Vec<MetricFamily>,

    /// When this report was generated.
    #[serde(with = "chrono_serde")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl EvaluationReport {
    /// Create an empty report.
    #[must_use]
    pub fn new(name: String, real_rows: usize, synthetic_rows: usize) -> Self {
        Self {
            name,
            real_rows,
            synthetic_rows,
            correlation: None,
            pearson_difference: None,
            privacy: None,
            distances: None,
            timings: Vec::new(),
            skipped: Vec::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Whether every requested family ran.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// All per-column distances, Jensen–Shannon first.
    pub fn column_distances(&self) -> impl Iterator<Item = &ColumnDistance> {
        self.distances.iter().flat_map(DistributionDistances::iter)
    }

    /// Total time spent in metric computation.
    #[must_use]
    pub fn total_time(&self) -> Duration {
        self.timings.iter().map(|t| t.elapsed).sum()
    }
}

// Custom serialization for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod chrono_serde {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        dt.to_rfc3339().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::DistanceKind;

    #[test]
    fn test_report_json_round_trip() {
        let mut report = EvaluationReport::new("adult".to_string(), 100, 80);
        report.timings.push(MetricTiming {
            family: MetricFamily::Privacy,
            elapsed: Duration::from_millis(250),
        });
        report.skipped.push(MetricFamily::Correlation);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"elapsed\":250"));
        assert!(json.contains("\"correlation\""));

        let back: EvaluationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timings[0].elapsed, Duration::from_millis(250));
        assert_eq!(back.skipped, vec![MetricFamily::Correlation]);
        assert!(!back.is_complete());
        assert_eq!(back.timestamp.timestamp(), report.timestamp.timestamp());
    }

    #[test]
    fn test_column_distances_empty_without_distribution() {
        let mut report = EvaluationReport::new("x".to_string(), 1, 1);
        assert_eq!(report.column_distances().count(), 0);
        report.distances = Some(DistributionDistances {
            jensen_shannon: vec![ColumnDistance {
                column: "c".to_string(),
                kind: DistanceKind::JensenShannon,
                distance: Some(0.1),
            }],
            wasserstein: Vec::new(),
        });
        assert_eq!(report.column_distances().count(), 1);
    }

    #[test]
    fn test_total_time() {
        let mut report = EvaluationReport::new("x".to_string(), 1, 1);
        for ms in [10, 20] {
            report.timings.push(MetricTiming {
                family: MetricFamily::Correlation,
                elapsed: Duration::from_millis(ms),
            });
        }
        assert_eq!(report.total_time(), Duration::from_millis(30));
    }
}
