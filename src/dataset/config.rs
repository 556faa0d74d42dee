//! JSON dataset configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::{ImputePolicy, UnknownCategoryPolicy};
use crate::dataset::{Dataset, Split, stratified_split};
use crate::error::{Error, Result};
use crate::table::import::find_header_index;
use crate::table::{Column, ColumnRoles, Table, read_csv};

/// Where a dataset lives and how its columns are interpreted.
///
/// # Example
///
/// ```
/// use synth_eval::dataset::DatasetConfig;
///
/// let config: DatasetConfig = serde_json::from_str(r#"{
///     "name": "adult",
///     "path_x": "X_train.csv",
///     "path_y": "y_train.csv",
///     "path_x_test": "X_test.csv",
///     "path_y_test": "y_test.csv",
///     "y_label": "income",
///     "categorical_columns": ["workclass", "education"]
/// }"#).unwrap();
/// assert_eq!(config.val_size, 0.2);
/// assert!(config.has_categorical_schema);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset name, used in logs and report file names.
    pub name: String,
    /// Training features CSV.
    pub path_x: PathBuf,
    /// Training labels CSV.
    pub path_y: PathBuf,
    /// Test features CSV.
    pub path_x_test: PathBuf,
    /// Test labels CSV.
    pub path_y_test: PathBuf,
    /// Label column name.
    pub y_label: String,
    /// Multi-valued categorical feature columns.
    #[serde(default)]
    pub categorical_columns: Vec<String>,
    /// Two-valued categorical feature columns.
    #[serde(default)]
    pub binary_columns: Vec<String>,
    /// Fraction of each class moved from train to validation.
    #[serde(default = "default_val_size")]
    pub val_size: f64,
    /// Seed for the train/validation split.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Whether categorical columns need a codebook.
    #[serde(default = "default_true")]
    pub has_categorical_schema: bool,
    /// Fill missing categorical values with this literal instead of the mode.
    #[serde(default)]
    pub missing_category: Option<String>,
    /// Handling of categories absent from the training codebook.
    #[serde(default)]
    pub unknown_categories: UnknownCategoryPolicy,
    /// Directory for synthetic data persistence.
    #[serde(default)]
    pub save_path: Option<PathBuf>,
}

fn default_val_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_true() -> bool {
    true
}

impl DatasetConfig {
    /// Read a config from a JSON file. Relative paths inside it are resolved
    /// against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.path_x);
        resolve(&mut self.path_y);
        resolve(&mut self.path_x_test);
        resolve(&mut self.path_y_test);
        if let Some(p) = self.save_path.as_mut() {
            resolve(p);
        }
    }

    /// Check field values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidConfig("name must not be empty".to_string()));
        }
        if self.y_label.trim().is_empty() {
            return Err(Error::InvalidConfig("y_label must not be empty".to_string()));
        }
        if !(0.0..1.0).contains(&self.val_size) {
            return Err(Error::InvalidConfig(format!(
                "val_size must be in [0, 1), got {}",
                self.val_size
            )));
        }
        Ok(())
    }

    /// Categorical imputation policy implied by `missing_category`.
    #[must_use]
    pub fn impute_policy(&self) -> ImputePolicy {
        self.missing_category
            .clone()
            .map_or(ImputePolicy::Statistics, ImputePolicy::MissingCategory)
    }

    /// Pick the label column out of a labels table: the column named
    /// `label` (case-insensitive), or the only column. The result is renamed
    /// to `label`.
    pub fn label_column(mut table: Table, label: &str) -> Result<Column> {
        let names = table.column_names();
        let name = match find_header_index(&names, label) {
            Some(idx) => names[idx].clone(),
            None if names.len() == 1 => names[0].clone(),
            None => return Err(Error::UnknownColumn(label.to_string())),
        };
        let mut column = table.remove_column(&name)?;
        column.name = label.to_string();
        Ok(column)
    }
}

impl Dataset {
    /// Load the CSVs named by `config`, split train into train and
    /// validation, and build the dataset.
    pub fn from_config(config: &DatasetConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(name = %config.name, "loading dataset");

        let x = read_csv(&config.path_x)?;
        let y = DatasetConfig::label_column(read_csv(&config.path_y)?, &config.y_label)?;
        let x_test = read_csv(&config.path_x_test)?;
        let y_test = DatasetConfig::label_column(read_csv(&config.path_y_test)?, &config.y_label)?;

        let full = Split::new(x, y)?;
        let indices = stratified_split(&full.labels.values, config.val_size, config.seed)?;
        let train = full.take_rows(&indices.train);
        let validation = full.take_rows(&indices.validation);

        let mut roles = ColumnRoles::infer(
            &train.features,
            config.y_label.clone(),
            config.categorical_columns.clone(),
            config.binary_columns.clone(),
        )?;
        roles.has_categorical_schema = config.has_categorical_schema;

        let mut builder = Dataset::builder(config.name.clone(), roles)
            .train(train)
            .validation(validation)
            .test(Split::new(x_test, y_test)?)
            .unknown_categories(config.unknown_categories)
            .impute(config.impute_policy());
        if let Some(path) = &config.save_path {
            builder = builder.save_path(path.clone());
        }
        builder.build()
    }
}
