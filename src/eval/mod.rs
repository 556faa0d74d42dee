//! Evaluation session and report generation.
//!
//! This module provides the core evaluation infrastructure:
//!
//! - [`session::EvalSession`]: Runs the enabled metric families over a dataset
//! - [`session::EvalConfig`]: Configuration for evaluation
//! - [`session::MetricConfig`]: Which metric families to compute
//! - [`report`]: Report types for evaluation results

pub mod report;
pub mod session;

pub use report::{EvaluationReport, MetricFamily, MetricTiming, PrivacyReport};
pub use session::{EvalConfig, EvalConfigBuilder, EvalSession, MetricConfig};
