//! Categorical encoding shared between real and synthetic tables.
//!
//! - [`CategoricalCodec`]: per-column codebooks fitted once on the training
//!   table and reused for every other table with the same schema
//! - [`LabelEncoder`]: ordinal (and one-hot) encoding of the class label
//! - [`FeatureEncoder`]: imputation plus codec application, producing a
//!   [`NumericTable`](crate::table::NumericTable)
//!
//! ## Example
//!
//! ```rust,ignore
//! use synth_eval::codec::CategoricalCodec;
//!
//! let codec = CategoricalCodec::fit(&train, &roles.categories())?;
//! let encoded = codec.encode(&synthetic)?;
//! assert_eq!(codec.decode(&encoded)?, synthetic);
//! ```

mod features;
mod label;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use features::{FeatureEncoder, ImputePolicy};
pub use label::LabelEncoder;

use crate::error::{Error, Result};
use crate::table::{Column, ColumnRoles, Table, Value};

/// What [`CategoricalCodec::encode`] does with a value missing from the codebook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// Fail with [`Error::UnknownCategory`].
    #[default]
    Fail,
    /// Assign trailing codes (`len`, `len + 1`, ...) to unseen values in order
    /// of first appearance within the encoded table. The codebook itself is
    /// not modified, so these codes cannot be decoded.
    Extend,
}

/// Ordered distinct categories observed in one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codebook {
    column: String,
    categories: Vec<Value>,
}

impl Codebook {
    /// Collect the distinct non-missing values of a column in ascending order.
    #[must_use]
    pub fn fit(column: &Column) -> Self {
        Self {
            column: column.name.clone(),
            categories: column.distinct().into_iter().cloned().collect(),
        }
    }

    /// Column this codebook belongs to.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Categories in code order.
    #[must_use]
    pub fn categories(&self) -> &[Value] {
        &self.categories
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the codebook is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Code of a category, if present.
    #[must_use]
    pub fn code_of(&self, value: &Value) -> Option<usize> {
        self.categories.binary_search(value).ok()
    }

    /// Category for a code, if in range.
    #[must_use]
    pub fn category(&self, code: usize) -> Option<&Value> {
        self.categories.get(code)
    }

    fn decode_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Missing => Ok(Value::Missing),
            Value::Number(x) if x.fract() == 0.0 && *x >= 0.0 => self
                .category(*x as usize)
                .cloned()
                .ok_or_else(|| self.invalid(*x)),
            Value::Number(x) => Err(self.invalid(*x)),
            Value::Text(s) => Err(Error::NonNumeric {
                column: self.column.clone(),
                value: s.clone(),
            }),
        }
    }

    fn invalid(&self, code: f64) -> Error {
        Error::InvalidCode {
            column: self.column.clone(),
            code,
            size: self.len(),
        }
    }
}

/// Codebooks for every categorical and binary column of a dataset.
///
/// The codec is built once by [`CategoricalCodec::fit`] and never mutated
/// afterwards, so a fitted codec can be shared freely across threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalCodec {
    codebooks: BTreeMap<String, Codebook>,
    policy: UnknownCategoryPolicy,
    identity: bool,
}

impl CategoricalCodec {
    /// Fit codebooks for the named columns of `table`.
    pub fn fit(table: &Table, columns: &[String]) -> Result<Self> {
        let codebooks = columns
            .iter()
            .map(|name| {
                let column = table.require(name)?;
                Ok((name.clone(), Codebook::fit(column)))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        tracing::debug!(columns = codebooks.len(), "fitted categorical codebooks");
        Ok(Self {
            codebooks,
            policy: UnknownCategoryPolicy::Fail,
            identity: false,
        })
    }

    /// Fit according to declared roles: the identity codec when the dataset
    /// has no categorical schema, otherwise codebooks for all categorical and
    /// binary columns.
    pub fn fit_with_roles(table: &Table, roles: &ColumnRoles) -> Result<Self> {
        if roles.has_categorical_schema {
            Self::fit(table, &roles.categories())
        } else {
            Ok(Self::identity())
        }
    }

    /// A codec whose `encode` and `decode` return their input unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            codebooks: BTreeMap::new(),
            policy: UnknownCategoryPolicy::Fail,
            identity: true,
        }
    }

    /// Set the policy for values absent from a codebook.
    #[must_use]
    pub fn with_policy(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether this is the identity codec.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Codebook of a column.
    #[must_use]
    pub fn codebook(&self, column: &str) -> Option<&Codebook> {
        self.codebooks.get(column)
    }

    /// Names of all encoded columns, sorted.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.codebooks.keys().map(String::as_str)
    }

    /// Replace every categorical value with its integer code.
    ///
    /// Columns without a codebook pass through unchanged, as do missing
    /// cells. Fails if a codebook column is absent from `table`.
    pub fn encode(&self, table: &Table) -> Result<Table> {
        if self.identity {
            return Ok(table.clone());
        }
        let mut out = table.clone();
        for (name, codebook) in &self.codebooks {
            let column = out
                .column_mut(name)
                .ok_or_else(|| Error::schema(format!("table lacks categorical column {name}")))?;
            self.encode_column(codebook, column)?;
        }
        Ok(out)
    }

    fn encode_column(&self, codebook: &Codebook, column: &mut Column) -> Result<()> {
        let mut extension: Vec<Value> = Vec::new();
        for value in &mut column.values {
            if value.is_missing() {
                continue;
            }
            let code = match codebook.code_of(value) {
                Some(code) => code,
                None => match self.policy {
                    UnknownCategoryPolicy::Fail => {
                        return Err(Error::UnknownCategory {
                            column: column.name.clone(),
                            value: value.to_string(),
                        });
                    }
                    UnknownCategoryPolicy::Extend => {
                        let offset = match extension.iter().position(|v| v == value) {
                            Some(i) => i,
                            None => {
                                extension.push(value.clone());
                                extension.len() - 1
                            }
                        };
                        codebook.len() + offset
                    }
                },
            };
            *value = Value::Number(code as f64);
        }
        if !extension.is_empty() {
            tracing::warn!(
                column = %column.name,
                unseen = extension.len(),
                "assigned trailing codes to categories missing from the codebook"
            );
        }
        Ok(())
    }

    /// Map integer codes back to categories; the exact inverse of [`encode`](Self::encode).
    pub fn decode(&self, table: &Table) -> Result<Table> {
        if self.identity {
            return Ok(table.clone());
        }
        let mut out = table.clone();
        for (name, codebook) in &self.codebooks {
            let column = out
                .column_mut(name)
                .ok_or_else(|| Error::schema(format!("table lacks categorical column {name}")))?;
            column.values = column
                .values
                .iter()
                .map(|v| codebook.decode_value(v))
                .collect::<Result<_>>()?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(vec![
            Column::new("color", ["red", "blue", "green", "blue"]),
            Column::new("size", [1.0, 2.0, 3.0, 4.0]),
            Column::new("flag", [1.0, 0.0, 0.0, 1.0]),
        ])
        .unwrap()
    }

    fn cats() -> Vec<String> {
        vec!["color".to_string(), "flag".to_string()]
    }

    #[test]
    fn test_codebook_sorted() {
        let codec = CategoricalCodec::fit(&table(), &cats()).unwrap();
        let book = codec.codebook("color").unwrap();
        assert_eq!(
            book.categories(),
            &[Value::text("blue"), Value::text("green"), Value::text("red")]
        );
        assert_eq!(book.code_of(&Value::text("red")), Some(2));
    }

    #[test]
    fn test_encode_codes() {
        let codec = CategoricalCodec::fit(&table(), &cats()).unwrap();
        let encoded = codec.encode(&table()).unwrap();
        let color: Vec<f64> = encoded
            .column("color")
            .unwrap()
            .values
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert_eq!(color, vec![2.0, 0.0, 1.0, 0.0]);
        // continuous columns untouched
        assert_eq!(encoded.column("size"), table().column("size"));
    }

    #[test]
    fn test_round_trip() {
        let t = table();
        let codec = CategoricalCodec::fit(&t, &cats()).unwrap();
        let back = codec.decode(&codec.encode(&t).unwrap()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let a = CategoricalCodec::fit(&table(), &cats()).unwrap();
        let b = CategoricalCodec::fit(&table(), &cats()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_category_fails_by_default() {
        let codec = CategoricalCodec::fit(&table(), &cats()).unwrap();
        let other = Table::new(vec![
            Column::new("color", ["purple"]),
            Column::new("size", [1.0]),
            Column::new("flag", [0.0]),
        ])
        .unwrap();
        let err = codec.encode(&other).unwrap_err();
        assert!(matches!(err, Error::UnknownCategory { ref column, .. } if column == "color"));
    }

    #[test]
    fn test_unknown_category_extend() {
        let codec = CategoricalCodec::fit(&table(), &cats())
            .unwrap()
            .with_policy(UnknownCategoryPolicy::Extend);
        let other = Table::new(vec![
            Column::new("color", ["purple", "red", "cyan", "purple"]),
            Column::new("size", [1.0, 1.0, 1.0, 1.0]),
            Column::new("flag", [0.0, 0.0, 0.0, 0.0]),
        ])
        .unwrap();
        let encoded = codec.encode(&other).unwrap();
        let color: Vec<f64> = encoded
            .column("color")
            .unwrap()
            .values
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert_eq!(color, vec![3.0, 2.0, 4.0, 3.0]);
        assert!(matches!(
            codec.decode(&encoded),
            Err(Error::InvalidCode { size: 3, .. })
        ));
    }

    #[test]
    fn test_decode_out_of_range() {
        let codec = CategoricalCodec::fit(&table(), &cats()).unwrap();
        let bad = Table::new(vec![
            Column::new("color", [7.0]),
            Column::new("size", [1.0]),
            Column::new("flag", [0.0]),
        ])
        .unwrap();
        assert!(matches!(
            codec.decode(&bad),
            Err(Error::InvalidCode { code, .. }) if code == 7.0
        ));
    }

    #[test]
    fn test_decode_rejects_fractional_and_negative_codes() {
        let codec = CategoricalCodec::fit(&table(), &cats()).unwrap();
        // 3.0 is the first code `Extend` would hand out for color
        for code in [1.5, -1.0, 3.0] {
            let bad = Table::new(vec![
                Column::new("color", [0.0, code]),
                Column::new("size", [1.0, 2.0]),
                Column::new("flag", [0.0, 1.0]),
            ])
            .unwrap();
            match codec.decode(&bad) {
                Err(Error::InvalidCode { column, code: got, size }) => {
                    assert_eq!(column, "color");
                    assert_eq!(got.to_bits(), code.to_bits());
                    assert_eq!(size, 3);
                }
                other => panic!("expected InvalidCode for {code}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_identity_codec() {
        let codec = CategoricalCodec::identity();
        let t = table();
        assert_eq!(codec.encode(&t).unwrap(), t);
        assert_eq!(codec.decode(&t).unwrap(), t);
        assert!(codec.is_identity());
    }

    #[test]
    fn test_missing_passes_through() {
        let t = Table::new(vec![Column {
            name: "color".to_string(),
            values: vec![Value::text("a"), Value::Missing],
        }])
        .unwrap();
        let codec = CategoricalCodec::fit(&t, &["color".to_string()]).unwrap();
        let encoded = codec.encode(&t).unwrap();
        assert_eq!(encoded.column("color").unwrap().values[1], Value::Missing);
    }
}
