//! Dense row-major matrix of `f64`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A dense row-major matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// A `rows x cols` matrix of zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// The single-element zero matrix returned for degenerate inputs.
    #[must_use]
    pub fn degenerate() -> Self {
        Self::zeros(1, 1)
    }

    /// Wrap a row-major buffer.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::DegenerateInput(format!(
                "buffer of {} values cannot form a {rows}x{cols} matrix",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from a list of equally long rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(Error::DegenerateInput(format!(
                    "row of length {} in matrix with {cols} columns",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Row-major backing buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Element at `(row, col)`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Set the element at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Borrow one row.
    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Copy one column out.
    #[must_use]
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.get(r, col)).collect()
    }

    /// Iterate over rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// Per-column minimum. Empty matrices yield an empty vector.
    #[must_use]
    pub fn column_min(&self) -> Vec<f64> {
        self.fold_columns(f64::INFINITY, f64::min)
    }

    /// Per-column maximum. Empty matrices yield an empty vector.
    #[must_use]
    pub fn column_max(&self) -> Vec<f64> {
        self.fold_columns(f64::NEG_INFINITY, f64::max)
    }

    fn fold_columns(&self, init: f64, f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
        if self.rows == 0 {
            return Vec::new();
        }
        let mut acc = vec![init; self.cols];
        for row in self.iter_rows() {
            for (a, &x) in acc.iter_mut().zip(row) {
                *a = f(*a, x);
            }
        }
        acc
    }

    /// Elementwise `self - other`.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        if self.shape() != other.shape() {
            return Err(Error::schema(format!(
                "matrix shapes differ: {:?} vs {:?}",
                self.shape(),
                other.shape()
            )));
        }
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| a - b)
                .collect(),
        })
    }

    /// Elementwise absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|x| x.abs()).collect(),
        }
    }

    /// Frobenius norm, `sqrt(sum(x^2))`.
    ///
    /// # Example
    ///
    /// ```
    /// use synth_eval::Matrix;
    ///
    /// let m = Matrix::from_rows(&[vec![3.0, 0.0], vec![0.0, 4.0]]).unwrap();
    /// assert!((m.frobenius_norm() - 5.0).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Whether `m[i][j] == m[j][i]` within `tol` for all entries.
    #[must_use]
    pub fn is_symmetric(&self, tol: f64) -> bool {
        self.rows == self.cols
            && (0..self.rows)
                .all(|i| (0..i).all(|j| (self.get(i, j) - self.get(j, i)).abs() <= tol))
    }
}
