//! Tabular data model.
//!
//! A [`Table`] is an ordered list of named [`Column`]s of equal length. Cells
//! are [`Value`]s, which may be numeric, textual or missing, so a single type
//! covers both the raw mixed-type tables read from CSV and their encoded,
//! purely numeric counterparts.
//!
//! [`ColumnRoles`] partitions the feature columns of a dataset into
//! categorical, binary and continuous sets and names the label column.
//! [`NumericTable`] is the dense `f64` form every metric engine consumes.

pub mod import;
mod numeric;

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub use import::{read_csv, write_csv};
pub use numeric::NumericTable;

use crate::error::{Error, Result};

/// A single table cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value (empty cell, `NA`, `NaN`, `null`).
    Missing,
    /// Numeric value. Never NaN; NaN is represented as [`Value::Missing`].
    Number(f64),
    /// Free-form text value.
    Text(String),
}

impl Value {
    /// Create a numeric value, mapping NaN to [`Value::Missing`] and `-0.0` to `0.0`.
    #[must_use]
    pub fn number(x: f64) -> Self {
        if x.is_nan() {
            Self::Missing
        } else if x == 0.0 {
            Self::Number(0.0)
        } else {
            Self::Number(x)
        }
    }

    /// Create a text value.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Parse a raw CSV cell.
    ///
    /// Empty cells and the usual missing markers become [`Value::Missing`],
    /// anything that parses as `f64` becomes [`Value::Number`], and the rest
    /// is kept as text.
    ///
    /// # Example
    ///
    /// ```
    /// use synth_eval::table::Value;
    ///
    /// assert_eq!(Value::parse("3.5"), Value::Number(3.5));
    /// assert_eq!(Value::parse(" NA "), Value::Missing);
    /// assert_eq!(Value::parse("red"), Value::text("red"));
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "" | "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL" | "None" => Self::Missing,
            _ => match trimmed.parse::<f64>() {
                Ok(x) => Self::number(x),
                Err(_) => Self::Text(trimmed.to_string()),
            },
        }
    }

    /// Whether this cell is missing.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Numeric view of the cell, if it holds a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(x) => Some(*x),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Number(_) => 1,
            Self::Text(_) => 2,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Missing sorts first, then numbers in ascending order, then text.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => canonical(*a).total_cmp(&canonical(*b)),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Missing => {}
            Self::Number(x) => canonical(*x).to_bits().hash(state),
            Self::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Number(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::number(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

fn canonical(x: f64) -> f64 {
    if x == 0.0 { 0.0 } else { x }
}

/// A named, homogeneous sequence of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Cell values in row order.
    pub values: Vec<Value>,
}

impl Column {
    /// Create a column from anything convertible into [`Value`]s.
    #[must_use]
    pub fn new<V: Into<Value>>(name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of missing cells.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }

    /// Distinct non-missing values in ascending order.
    #[must_use]
    pub fn distinct(&self) -> BTreeSet<&Value> {
        self.values.iter().filter(|v| !v.is_missing()).collect()
    }

    /// Distinct non-missing values in order of first appearance.
    #[must_use]
    pub fn unique_in_order(&self) -> Vec<Value> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for value in &self.values {
            if !value.is_missing() && seen.insert(value) {
                out.push(value.clone());
            }
        }
        out
    }

    /// Occurrence count of each non-missing value.
    #[must_use]
    pub fn value_counts(&self) -> HashMap<&Value, usize> {
        let mut counts = HashMap::new();
        for value in self.values.iter().filter(|v| !v.is_missing()) {
            *counts.entry(value).or_insert(0) += 1;
        }
        counts
    }

    /// Most frequent non-missing value; ties resolve to the smallest value.
    #[must_use]
    pub fn mode(&self) -> Option<&Value> {
        self.value_counts()
            .into_iter()
            .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| vb.cmp(va)))
            .map(|(value, _)| value)
    }

    /// Mean of the numeric cells, ignoring missing ones.
    ///
    /// Returns an error if a non-missing cell is not numeric, and `None` if
    /// every cell is missing.
    pub fn numeric_mean(&self) -> Result<Option<f64>> {
        let mut sum = 0.0;
        let mut n = 0usize;
        for value in &self.values {
            match value {
                Value::Missing => {}
                Value::Number(x) => {
                    sum += x;
                    n += 1;
                }
                Value::Text(s) => {
                    return Err(Error::NonNumeric {
                        column: self.name.clone(),
                        value: s.clone(),
                    });
                }
            }
        }
        Ok((n > 0).then(|| sum / n as f64))
    }

    /// Keep only the given rows, in the given order.
    #[must_use]
    pub fn take(&self, rows: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            values: rows.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }
}

/// An ordered collection of equally long named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Create a table, checking that all columns have the same length and
    /// that column names are unique.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            for column in &columns {
                if column.len() != expected {
                    return Err(Error::RaggedTable {
                        column: column.name.clone(),
                        expected,
                        actual: column.len(),
                    });
                }
            }
        }
        let mut names = BTreeSet::new();
        for column in &columns {
            if !names.insert(column.name.as_str()) {
                return Err(Error::schema(format!("duplicate column {}", column.name)));
            }
        }
        Ok(Self { columns })
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    /// Number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    /// All columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column by name, failing with [`Error::UnknownColumn`].
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Position of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Project onto the named columns, in the given order.
    pub fn select(&self, names: &[String]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|name| self.require(name).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// Keep only the given rows, in the given order.
    #[must_use]
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
        }
    }

    /// Remove a column and return it.
    pub fn remove_column(&mut self, name: &str) -> Result<Column> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))?;
        Ok(self.columns.remove(idx))
    }

    /// Append a column at the end.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if !self.columns.is_empty() && column.len() != self.n_rows() {
            let actual = column.len();
            return Err(Error::RaggedTable {
                column: column.name,
                expected: self.n_rows(),
                actual,
            });
        }
        if self.column(&column.name).is_some() {
            return Err(Error::schema(format!("duplicate column {}", column.name)));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Append the rows of `other`, which must have the same column names in
    /// the same order.
    pub fn append_rows(&mut self, other: &Self) -> Result<()> {
        if self.column_names() != other.column_names() {
            return Err(Error::schema(format!(
                "cannot append rows with columns {:?} to table with columns {:?}",
                other.column_names(),
                self.column_names()
            )));
        }
        for (dst, src) in self.columns.iter_mut().zip(&other.columns) {
            dst.values.extend(src.values.iter().cloned());
        }
        Ok(())
    }
}

/// The role a column plays in a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Multi-valued categorical feature.
    Categorical,
    /// Two-valued categorical feature.
    Binary,
    /// Numeric feature.
    Continuous,
    /// Class label, never a feature.
    Label,
}

/// Partition of a dataset's columns by role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRoles {
    /// Multi-valued categorical features.
    pub categorical: Vec<String>,
    /// Two-valued categorical features.
    pub binary: Vec<String>,
    /// Numeric features.
    pub continuous: Vec<String>,
    /// Label column name.
    pub label: String,
    /// Whether categorical/binary columns hold raw categories that need a
    /// codebook. When `false`, every feature is already numeric and category
    /// encoding is the identity.
    #[serde(default = "default_true")]
    pub has_categorical_schema: bool,
}

fn default_true() -> bool {
    true
}

impl ColumnRoles {
    /// Build roles from a feature table: every column not listed as
    /// categorical or binary is continuous, in table order.
    pub fn infer(
        features: &Table,
        label: impl Into<String>,
        categorical: Vec<String>,
        binary: Vec<String>,
    ) -> Result<Self> {
        let label = label.into();
        let continuous = features
            .column_names()
            .into_iter()
            .filter(|name| !categorical.contains(name) && !binary.contains(name) && *name != label)
            .collect();
        let roles = Self {
            categorical,
            binary,
            continuous,
            label,
            has_categorical_schema: true,
        };
        roles.validate(features)?;
        Ok(roles)
    }

    /// Categorical followed by binary column names.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.categorical.iter().chain(&self.binary).cloned().collect()
    }

    /// Role of a column, if it is known.
    #[must_use]
    pub fn role_of(&self, name: &str) -> Option<ColumnRole> {
        if name == self.label {
            Some(ColumnRole::Label)
        } else if self.categorical.iter().any(|c| c == name) {
            Some(ColumnRole::Categorical)
        } else if self.binary.iter().any(|c| c == name) {
            Some(ColumnRole::Binary)
        } else if self.continuous.iter().any(|c| c == name) {
            Some(ColumnRole::Continuous)
        } else {
            None
        }
    }

    /// Whether a column is categorical or binary.
    #[must_use]
    pub fn is_category(&self, name: &str) -> bool {
        matches!(
            self.role_of(name),
            Some(ColumnRole::Categorical | ColumnRole::Binary)
        )
    }

    /// Number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.categorical.len() + self.binary.len() + self.continuous.len()
    }

    /// Check that the role sets are disjoint, exclude the label, and cover
    /// exactly the columns of `features`.
    pub fn validate(&self, features: &Table) -> Result<()> {
        let mut seen = BTreeSet::new();
        for name in self.categorical.iter().chain(&self.binary).chain(&self.continuous) {
            if *name == self.label {
                return Err(Error::schema(format!("label column {name} listed as a feature")));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::schema(format!("column {name} has more than one role")));
            }
        }
        let actual: BTreeSet<String> = features.column_names().into_iter().collect();
        let declared: BTreeSet<String> = seen.into_iter().map(String::from).collect();
        if actual != declared {
            let missing: Vec<_> = declared.difference(&actual).collect();
            let extra: Vec<_> = actual.difference(&declared).collect();
            return Err(Error::schema(format!(
                "feature columns disagree with roles (missing: {missing:?}, undeclared: {extra:?})"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::new(vec![
            Column::new("color", ["red", "blue", "red"]),
            Column::new("size", [1.0, 2.0, 3.0]),
            Column::new("flag", [0.0, 1.0, 1.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_value_parse() {
        assert_eq!(Value::parse("1e3"), Value::Number(1000.0));
        assert_eq!(Value::parse(""), Value::Missing);
        assert_eq!(Value::parse("NaN"), Value::Missing);
        assert_eq!(Value::parse(" blue "), Value::text("blue"));
    }

    #[test]
    fn test_value_ordering() {
        let mut values = vec![
            Value::text("b"),
            Value::Number(2.0),
            Value::Missing,
            Value::text("a"),
            Value::Number(-1.0),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Missing,
                Value::Number(-1.0),
                Value::Number(2.0),
                Value::text("a"),
                Value::text("b"),
            ]
        );
        assert_eq!(Value::number(-0.0), Value::Number(0.0));
    }

    #[test]
    fn test_ragged_table_rejected() {
        let err = Table::new(vec![
            Column::new("a", [1.0, 2.0]),
            Column::new("b", [1.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::RaggedTable { .. }));
    }

    #[test]
    fn test_push_column_length_mismatch() {
        let mut table = Table::new(vec![Column::new("a", [1.0, 2.0])]).unwrap();
        let err = table.push_column(Column::new("b", [1.0])).unwrap_err();
        assert!(matches!(
            err,
            Error::RaggedTable { ref column, expected: 2, actual: 1 } if column == "b"
        ));
        assert_eq!(table.n_cols(), 1);
        table.push_column(Column::new("b", [3.0, 4.0])).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_column_mode_prefers_smallest_on_tie() {
        let column = Column::new("c", ["b", "a", "b", "a", "c"]);
        assert_eq!(column.mode(), Some(&Value::text("a")));
    }

    #[test]
    fn test_unique_in_order() {
        let column = Column::new("c", ["b", "a", "b", "c"]);
        assert_eq!(
            column.unique_in_order(),
            vec![Value::text("b"), Value::text("a"), Value::text("c")]
        );
    }

    #[test]
    fn test_select_and_take_rows() {
        let table = sample_table();
        let selected = table
            .select(&["size".to_string(), "color".to_string()])
            .unwrap();
        assert_eq!(selected.column_names(), vec!["size", "color"]);

        let rows = table.take_rows(&[2, 0]);
        assert_eq!(rows.n_rows(), 2);
        assert_eq!(rows.column("size").unwrap().values[0], Value::Number(3.0));
    }

    #[test]
    fn test_roles_infer_continuous() {
        let table = sample_table();
        let roles = ColumnRoles::infer(
            &table,
            "target",
            vec!["color".to_string()],
            vec!["flag".to_string()],
        )
        .unwrap();
        assert_eq!(roles.continuous, vec!["size"]);
        assert_eq!(roles.categories(), vec!["color", "flag"]);
        assert_eq!(roles.role_of("flag"), Some(ColumnRole::Binary));
        assert_eq!(roles.role_of("target"), Some(ColumnRole::Label));
    }

    #[test]
    fn test_roles_reject_overlap() {
        let table = sample_table();
        let roles = ColumnRoles {
            categorical: vec!["color".to_string()],
            binary: vec!["color".to_string(), "flag".to_string()],
            continuous: vec!["size".to_string()],
            label: "target".to_string(),
            has_categorical_schema: true,
        };
        assert!(matches!(
            roles.validate(&table),
            Err(Error::SchemaMismatch { .. })
        ));
    }
}
