use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::table::Value;

/// Ordinal encoding of class labels, independent of the feature codec.
///
/// Classes are kept in ascending order, so class `i` encodes to `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<Value>,
}

impl LabelEncoder {
    /// Fit on every non-missing label across the given label sets.
    ///
    /// # Example
    ///
    /// ```
    /// use synth_eval::codec::LabelEncoder;
    /// use synth_eval::table::Value;
    ///
    /// let labels = vec![Value::text("unacc"), Value::text("acc"), Value::text("unacc")];
    /// let encoder = LabelEncoder::fit([labels.as_slice()]);
    /// assert_eq!(encoder.encode(&labels).unwrap(), vec![1, 0, 1]);
    /// ```
    #[must_use]
    pub fn fit<'a>(label_sets: impl IntoIterator<Item = &'a [Value]>) -> Self {
        let mut classes: Vec<Value> = label_sets
            .into_iter()
            .flatten()
            .filter(|v| !v.is_missing())
            .cloned()
            .collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Known classes in code order.
    #[must_use]
    pub fn classes(&self) -> &[Value] {
        &self.classes
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Code of one label.
    pub fn encode_one(&self, label: &Value) -> Result<usize> {
        self.classes
            .binary_search(label)
            .map_err(|_| Error::UnknownClass(label.to_string()))
    }

    /// Codes of a label sequence.
    pub fn encode(&self, labels: &[Value]) -> Result<Vec<usize>> {
        labels.iter().map(|l| self.encode_one(l)).collect()
    }

    /// Labels of a code sequence.
    pub fn decode(&self, codes: &[usize]) -> Result<Vec<Value>> {
        codes
            .iter()
            .map(|&code| {
                self.classes.get(code).cloned().ok_or(Error::InvalidCode {
                    column: "label".to_string(),
                    code: code as f64,
                    size: self.classes.len(),
                })
            })
            .collect()
    }

    /// One-hot matrix with one row per label and one column per class.
    pub fn one_hot(&self, labels: &[Value]) -> Result<Matrix> {
        let mut m = Matrix::zeros(labels.len(), self.classes.len());
        for (row, code) in self.encode(labels)?.into_iter().enumerate() {
            m.set(row, code, 1.0);
        }
        Ok(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: &[&str]) -> Vec<Value> {
        raw.iter().map(|s| Value::text(*s)).collect()
    }

    #[test]
    fn test_fit_across_splits() {
        let train = labels(&["b", "a"]);
        let test = labels(&["c"]);
        let encoder = LabelEncoder::fit([train.as_slice(), test.as_slice()]);
        assert_eq!(encoder.n_classes(), 3);
        assert_eq!(encoder.encode(&test).unwrap(), vec![2]);
    }

    #[test]
    fn test_decode_round_trip() {
        let y = labels(&["x", "y", "x"]);
        let encoder = LabelEncoder::fit([y.as_slice()]);
        let codes = encoder.encode(&y).unwrap();
        assert_eq!(encoder.decode(&codes).unwrap(), y);
        assert!(encoder.decode(&[9]).is_err());
    }

    #[test]
    fn test_unknown_class() {
        let encoder = LabelEncoder::fit([labels(&["a"]).as_slice()]);
        assert!(matches!(
            encoder.encode(&labels(&["z"])),
            Err(Error::UnknownClass(_))
        ));
    }

    #[test]
    fn test_one_hot() {
        let y = labels(&["b", "a", "b"]);
        let encoder = LabelEncoder::fit([y.as_slice()]);
        let m = encoder.one_hot(&y).unwrap();
        assert_eq!(m.shape(), (3, 2));
        assert_eq!(m.row(0), &[0.0, 1.0]);
        assert_eq!(m.row(1), &[1.0, 0.0]);
    }
}
