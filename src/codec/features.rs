use serde::{Deserialize, Serialize};

use crate::codec::CategoricalCodec;
use crate::error::{Error, Result};
use crate::table::{Column, ColumnRole, ColumnRoles, NumericTable, Table, Value};

/// How missing categorical values are filled before encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputePolicy {
    /// Column mode for categorical columns, column mean for continuous ones.
    #[default]
    Statistics,
    /// A dedicated literal category for categorical columns (continuous
    /// columns still use the mean). The codebook must contain the literal.
    MissingCategory(String),
}

/// Turns a mixed-type feature table into a fully numeric one.
///
/// Missing values are imputed first, using statistics of the table being
/// encoded, then categorical and binary columns are replaced by their codes.
/// Continuous columns pass through. Column order and row count are kept.
#[derive(Debug, Clone)]
pub struct FeatureEncoder<'a> {
    codec: &'a CategoricalCodec,
    roles: &'a ColumnRoles,
    policy: ImputePolicy,
}

impl<'a> FeatureEncoder<'a> {
    /// Create an encoder over a fitted codec and the dataset's roles.
    #[must_use]
    pub fn new(codec: &'a CategoricalCodec, roles: &'a ColumnRoles) -> Self {
        Self {
            codec,
            roles,
            policy: ImputePolicy::default(),
        }
    }

    /// Set the categorical imputation policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ImputePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fill every missing cell of a feature table.
    pub fn impute(&self, table: &Table) -> Result<Table> {
        self.roles.validate(table)?;
        let columns = table
            .columns()
            .iter()
            .map(|column| self.impute_column(column))
            .collect::<Result<Vec<_>>>()?;
        Table::new(columns)
    }

    fn impute_column(&self, column: &Column) -> Result<Column> {
        if column.missing_count() == 0 {
            return Ok(column.clone());
        }
        let fill = match self.roles.role_of(&column.name) {
            Some(ColumnRole::Continuous) => match column.numeric_mean()? {
                Some(mean) => Value::number(mean),
                None => {
                    tracing::warn!(column = %column.name, "continuous column is entirely missing, filling with 0");
                    Value::Number(0.0)
                }
            },
            Some(ColumnRole::Categorical | ColumnRole::Binary) => match &self.policy {
                ImputePolicy::MissingCategory(literal) => Value::text(literal.clone()),
                ImputePolicy::Statistics => match column.mode() {
                    Some(mode) => mode.clone(),
                    None => {
                        let fallback = self
                            .codec
                            .codebook(&column.name)
                            .and_then(|book| book.category(0))
                            .cloned()
                            .unwrap_or(Value::Number(0.0));
                        tracing::warn!(
                            column = %column.name,
                            fill = %fallback,
                            "categorical column is entirely missing, filling with first category"
                        );
                        fallback
                    }
                },
            },
            _ => return Err(Error::schema(format!("{} is not a feature column", column.name))),
        };
        Ok(Column {
            name: column.name.clone(),
            values: column
                .values
                .iter()
                .map(|v| if v.is_missing() { fill.clone() } else { v.clone() })
                .collect(),
        })
    }

    /// Impute, encode categories and convert to a [`NumericTable`].
    pub fn encode(&self, table: &Table) -> Result<NumericTable> {
        let imputed = self.impute(table)?;
        let encoded = self.codec.encode(&imputed)?;
        to_numeric(&encoded)
    }
}

/// Convert a table whose cells are all numbers into a [`NumericTable`].
pub(crate) fn to_numeric(table: &Table) -> Result<NumericTable> {
    let columns = table
        .columns()
        .iter()
        .map(|column| {
            let values = column
                .values
                .iter()
                .map(|v| match v {
                    Value::Number(x) => Ok(*x),
                    other => Err(Error::NonNumeric {
                        column: column.name.clone(),
                        value: if other.is_missing() {
                            "<missing>".to_string()
                        } else {
                            other.to_string()
                        },
                    }),
                })
                .collect::<Result<Vec<f64>>>()?;
            Ok((column.name.clone(), values))
        })
        .collect::<Result<Vec<_>>>()?;
    NumericTable::from_columns(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> ColumnRoles {
        ColumnRoles {
            categorical: vec!["color".to_string()],
            binary: vec![],
            continuous: vec!["size".to_string()],
            label: "y".to_string(),
            has_categorical_schema: true,
        }
    }

    fn table_with_gaps() -> Table {
        Table::new(vec![
            Column {
                name: "size".to_string(),
                values: vec![Value::Number(1.0), Value::Missing, Value::Number(5.0)],
            },
            Column {
                name: "color".to_string(),
                values: vec![Value::text("red"), Value::text("red"), Value::Missing],
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_impute_mean_and_mode() {
        let roles = roles();
        let codec = CategoricalCodec::fit(&table_with_gaps(), &roles.categories()).unwrap();
        let imputed = FeatureEncoder::new(&codec, &roles)
            .impute(&table_with_gaps())
            .unwrap();
        assert_eq!(imputed.column("size").unwrap().values[1], Value::Number(3.0));
        assert_eq!(imputed.column("color").unwrap().values[2], Value::text("red"));
    }

    #[test]
    fn test_encode_preserves_order_and_fills() {
        let roles = roles();
        let codec = CategoricalCodec::fit(&table_with_gaps(), &roles.categories()).unwrap();
        let encoded = FeatureEncoder::new(&codec, &roles)
            .encode(&table_with_gaps())
            .unwrap();
        assert_eq!(encoded.names(), &["size".to_string(), "color".to_string()]);
        assert_eq!(encoded.n_rows(), 3);
        assert!(encoded.matrix().as_slice().iter().all(|x| x.is_finite()));
        assert_eq!(encoded.column("color").unwrap(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_missing_category_policy_requires_codebook_entry() {
        let roles = roles();
        let codec = CategoricalCodec::fit(&table_with_gaps(), &roles.categories()).unwrap();
        let encoder = FeatureEncoder::new(&codec, &roles)
            .with_policy(ImputePolicy::MissingCategory("Missing".to_string()));
        assert!(matches!(
            encoder.encode(&table_with_gaps()),
            Err(Error::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_rejects_label_column() {
        let roles = roles();
        let codec = CategoricalCodec::fit(&table_with_gaps(), &roles.categories()).unwrap();
        let mut table = table_with_gaps();
        table.push_column(Column::new("y", ["a", "b", "c"])).unwrap();
        assert!(matches!(
            FeatureEncoder::new(&codec, &roles).encode(&table),
            Err(Error::SchemaMismatch { .. })
        ));
    }
}
