//! Error types for synth-eval operations.

use thiserror::Error;

/// Result type alias for synth-eval operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, encoding or evaluating tabular data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Real and synthetic column sets, or their declared roles, disagree.
    #[error("Schema mismatch: {reason}")]
    SchemaMismatch {
        /// Description of the disagreement.
        reason: String,
    },

    /// A categorical value is absent from the column's codebook.
    #[error("Unknown category in column {column}: {value}")]
    UnknownCategory {
        /// Column being encoded.
        column: String,
        /// The value that has no code.
        value: String,
    },

    /// A code does not index into the column's codebook.
    #[error("Invalid code in column {column}: {code} (codebook has {size} entries)")]
    InvalidCode {
        /// Column being decoded.
        column: String,
        /// The offending code.
        code: f64,
        /// Number of entries in the codebook.
        size: usize,
    },

    /// A value that must be numeric could not be interpreted as a number.
    #[error("Non-numeric value in column {column}: {value}")]
    NonNumeric {
        /// Column holding the value.
        column: String,
        /// The value as text.
        value: String,
    },

    /// A referenced column does not exist in the table.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A referenced class label was never seen by the label encoder.
    #[error("Unknown class label: {0}")]
    UnknownClass(String),

    /// Columns of one table have different lengths.
    #[error("Column {column} has {actual} rows, expected {expected}")]
    RaggedTable {
        /// Column with the wrong length.
        column: String,
        /// Row count of the table.
        expected: usize,
        /// Row count of the column.
        actual: usize,
    },

    /// A computation received an input it cannot produce a defined result for.
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// A sampled class subset cannot satisfy the requested size.
    #[error("Class {class} has {available} rows, cannot sample {requested}")]
    EmptyPartition {
        /// Class label as text.
        class: String,
        /// Number of rows requested.
        requested: usize,
        /// Number of rows available.
        available: usize,
    },

    /// A metric needs more rows than the input provides.
    #[error("{what} needs at least {required} rows, got {actual}")]
    InsufficientRows {
        /// Which input was too small.
        what: String,
        /// Minimum row count.
        required: usize,
        /// Actual row count.
        actual: usize,
    },

    /// A synthetic table was required but has not been attached.
    #[error("No synthetic data attached to dataset {0}")]
    MissingSynthetic(String),

    /// Invalid configuration or argument.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error importing CSV data.
    #[error("CSV import error at line {line}: {reason}")]
    CsvImport {
        /// Line number where the error occurred.
        line: usize,
        /// Reason for the failure.
        reason: String,
    },

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Build a [`Error::SchemaMismatch`] from any displayable reason.
    pub(crate) fn schema(reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            reason: reason.into(),
        }
    }
}
