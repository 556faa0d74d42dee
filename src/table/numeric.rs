use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::table::{Column, Table, Value};

/// A fully numeric table: column names plus a dense row-major matrix.
///
/// This is the form produced by the feature encoder and consumed by every
/// metric engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericTable {
    names: Vec<String>,
    matrix: Matrix,
}

impl NumericTable {
    /// Pair column names with a matrix of the same width.
    pub fn new(names: Vec<String>, matrix: Matrix) -> Result<Self> {
        if names.len() != matrix.cols() {
            return Err(Error::schema(format!(
                "{} column names for a matrix with {} columns",
                names.len(),
                matrix.cols()
            )));
        }
        Ok(Self { names, matrix })
    }

    /// Build from named numeric columns of equal length.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let rows = columns.first().map_or(0, |(_, v)| v.len());
        let cols = columns.len();
        let mut data = vec![0.0; rows * cols];
        let mut names = Vec::with_capacity(cols);
        for (j, (name, values)) in columns.into_iter().enumerate() {
            if values.len() != rows {
                return Err(Error::RaggedTable {
                    column: name,
                    expected: rows,
                    actual: values.len(),
                });
            }
            for (i, x) in values.into_iter().enumerate() {
                data[i * cols + j] = x;
            }
            names.push(name);
        }
        Ok(Self {
            names,
            matrix: Matrix::from_vec(rows, cols, data)?,
        })
    }

    /// Column names in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The underlying matrix.
    #[must_use]
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.matrix.rows()
    }

    /// Number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.matrix.cols()
    }

    /// Position of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Copy a column out by name.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        self.column_index(name)
            .map(|j| self.matrix.column(j))
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Project onto the named columns, in the given order.
    pub fn select(&self, names: &[String]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|name| Ok((name.clone(), self.column(name)?)))
            .collect::<Result<Vec<_>>>()?;
        if columns.is_empty() {
            return Self::new(Vec::new(), Matrix::zeros(self.n_rows(), 0));
        }
        Self::from_columns(columns)
    }

    /// Fail with [`Error::SchemaMismatch`] unless `other` has the same
    /// column names in the same order.
    pub fn ensure_same_columns(&self, other: &Self) -> Result<()> {
        if self.names != other.names {
            return Err(Error::schema(format!(
                "columns {:?} do not match {:?}",
                other.names, self.names
            )));
        }
        Ok(())
    }

    /// Convert back to a [`Table`] of numeric values.
    ///
    /// Fails with [`Error::SchemaMismatch`] when two columns share a name.
    pub fn to_table(&self) -> Result<Table> {
        let columns = self
            .names
            .iter()
            .enumerate()
            .map(|(j, name)| Column {
                name: name.clone(),
                values: self.matrix.column(j).into_iter().map(Value::number).collect(),
            })
            .collect();
        Table::new(columns)
    }
}
