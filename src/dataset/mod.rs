//! Dataset container.
//!
//! A [`Dataset`] owns the real train/validation/test splits, the optional
//! synthetic split, the column roles, the categorical codec fitted on the
//! training features, the label encoder and the min–max normalization
//! bounds. Every metric engine reads its inputs from here; none of them
//! mutates it.
//!
//! Building a dataset fixes the codec once. Class-level mutations
//! ([`Dataset::merge_classes`], [`Dataset::create_bins`]) re-fit only the
//! label encoder; row-level ones ([`Dataset::reduce_size`],
//! [`Dataset::drop_first_n`], [`Dataset::oversample`]) touch only the train
//! split.

mod config;
mod io;
mod split;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub use config::DatasetConfig;
pub use split::{SplitIndices, stratified_split};

use crate::codec::{CategoricalCodec, FeatureEncoder, ImputePolicy, LabelEncoder, UnknownCategoryPolicy};
use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::table::{Column, ColumnRoles, NumericTable, Table, Value};

/// One of the real data splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitKind {
    /// Training rows; the codec is fitted here.
    Train,
    /// Validation rows.
    Validation,
    /// Held-out test rows.
    Test,
}

/// Feature table plus label column with the same number of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// Feature columns.
    pub features: Table,
    /// Label column.
    pub labels: Column,
}

impl Split {
    /// Pair features with labels, checking row counts agree.
    pub fn new(features: Table, labels: Column) -> Result<Self> {
        if !features.columns().is_empty() && features.n_rows() != labels.len() {
            let actual = labels.len();
            return Err(Error::RaggedTable {
                column: labels.name,
                expected: features.n_rows(),
                actual,
            });
        }
        Ok(Self { features, labels })
    }

    /// Same columns, no rows.
    #[must_use]
    pub fn empty_like(other: &Self) -> Self {
        other.take_rows(&[])
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    /// Keep only the given rows, in the given order.
    #[must_use]
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            features: self.features.take_rows(rows),
            labels: self.labels.take(rows),
        }
    }

    /// Indices of rows whose label equals `class`.
    #[must_use]
    pub fn class_indices(&self, class: &Value) -> Vec<usize> {
        self.labels
            .values
            .iter()
            .enumerate()
            .filter(|(_, v)| *v == class)
            .map(|(i, _)| i)
            .collect()
    }

    /// Label counts, most frequent first; ties in ascending label order.
    #[must_use]
    pub fn class_counts(&self) -> Vec<(Value, usize)> {
        let mut counts: Vec<(Value, usize)> = self
            .labels
            .value_counts()
            .into_iter()
            .map(|(v, c)| (v.clone(), c))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    fn remove_rows(&mut self, rows: &BTreeSet<usize>) {
        let keep: Vec<usize> = (0..self.n_rows()).filter(|i| !rows.contains(i)).collect();
        *self = self.take_rows(&keep);
    }

    fn relabel(&mut self, f: impl Fn(&Value) -> Result<Value>) -> Result<()> {
        self.labels.values = self.labels.values.iter().map(f).collect::<Result<_>>()?;
        Ok(())
    }
}

/// Per-feature minimum and maximum over the encoded real splits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationBounds {
    /// Feature names in column order.
    pub columns: Vec<String>,
    /// Column minima.
    pub min: Vec<f64>,
    /// Column maxima.
    pub max: Vec<f64>,
}

impl NormalizationBounds {
    /// Elementwise min/max across several encoded tables with the same columns.
    pub fn compute(tables: &[&NumericTable]) -> Result<Self> {
        let Some(first) = tables.first() else {
            return Err(Error::DegenerateInput("no tables to compute bounds from".to_string()));
        };
        let cols = first.n_cols();
        let mut min = vec![f64::INFINITY; cols];
        let mut max = vec![f64::NEG_INFINITY; cols];
        for table in tables {
            first.ensure_same_columns(table)?;
            for (j, (lo, hi)) in table
                .matrix()
                .column_min()
                .into_iter()
                .zip(table.matrix().column_max())
                .enumerate()
            {
                min[j] = min[j].min(lo);
                max[j] = max[j].max(hi);
            }
        }
        Ok(Self {
            columns: first.names().to_vec(),
            min,
            max,
        })
    }

    /// Scale every column to `[0, 1]`; columns with zero range map to 0.
    pub fn normalize(&self, table: &NumericTable) -> Result<NumericTable> {
        if table.names() != self.columns.as_slice() {
            return Err(Error::schema(format!(
                "cannot normalize columns {:?} with bounds for {:?}",
                table.names(),
                self.columns
            )));
        }
        let (rows, cols) = table.matrix().shape();
        let mut data = Vec::with_capacity(rows * cols);
        for row in table.matrix().iter_rows() {
            for ((x, lo), hi) in row.iter().zip(&self.min).zip(&self.max) {
                let range = hi - lo;
                data.push(if range > 0.0 { (x - lo) / range } else { 0.0 });
            }
        }
        NumericTable::new(self.columns.clone(), Matrix::from_vec(rows, cols, data)?)
    }
}

/// Summary of a dataset, as printed by `info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Dataset name.
    pub name: String,
    /// Majority-class count over minority-class count.
    pub imbalance: f64,
    /// Number of continuous features.
    pub continuous: usize,
    /// Number of categorical and binary features.
    pub categorical: usize,
    /// Train plus validation rows.
    pub train_samples: usize,
    /// Test rows.
    pub test_samples: usize,
}

/// Real and synthetic tables with their shared encoding state.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    roles: ColumnRoles,
    train: Split,
    validation: Split,
    test: Split,
    synthetic: Option<Split>,
    codec: CategoricalCodec,
    labels: LabelEncoder,
    impute: ImputePolicy,
    bounds: NormalizationBounds,
    save_path: Option<PathBuf>,
}

/// Builder for [`Dataset`].
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    name: String,
    roles: ColumnRoles,
    train: Option<Split>,
    validation: Option<Split>,
    test: Option<Split>,
    unknown_categories: UnknownCategoryPolicy,
    impute: ImputePolicy,
    save_path: Option<PathBuf>,
}

impl DatasetBuilder {
    /// Training split (required).
    #[must_use]
    pub fn train(mut self, split: Split) -> Self {
        self.train = Some(split);
        self
    }

    /// Validation split; empty when not given.
    #[must_use]
    pub fn validation(mut self, split: Split) -> Self {
        self.validation = Some(split);
        self
    }

    /// Test split; empty when not given.
    #[must_use]
    pub fn test(mut self, split: Split) -> Self {
        self.test = Some(split);
        self
    }

    /// What to do with categories absent from the training codebook.
    #[must_use]
    pub fn unknown_categories(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.unknown_categories = policy;
        self
    }

    /// How missing categorical values are filled.
    #[must_use]
    pub fn impute(mut self, policy: ImputePolicy) -> Self {
        self.impute = policy;
        self
    }

    /// Directory for synthetic persistence.
    #[must_use]
    pub fn save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }

    /// Validate the splits, fit the codec and label encoder, and compute
    /// normalization bounds.
    pub fn build(self) -> Result<Dataset> {
        let mut train = self
            .train
            .ok_or_else(|| Error::InvalidConfig("dataset needs a train split".to_string()))?;
        let mut validation = self.validation.unwrap_or_else(|| Split::empty_like(&train));
        let mut test = self.test.unwrap_or_else(|| Split::empty_like(&train));

        self.roles.validate(&train.features)?;
        let order = train.features.column_names();
        validation.features = validation.features.select(&order)?;
        test.features = test.features.select(&order)?;

        if let ImputePolicy::MissingCategory(literal) = &self.impute {
            for split in [&mut train, &mut validation, &mut test] {
                fill_missing_categories(&mut split.features, &self.roles, literal);
            }
        }

        let codec = CategoricalCodec::fit_with_roles(&train.features, &self.roles)?
            .with_policy(self.unknown_categories);
        let labels = LabelEncoder::fit([
            train.labels.values.as_slice(),
            validation.labels.values.as_slice(),
            test.labels.values.as_slice(),
        ]);

        let mut dataset = Dataset {
            name: self.name,
            roles: self.roles,
            train,
            validation,
            test,
            synthetic: None,
            codec,
            labels,
            impute: self.impute,
            bounds: NormalizationBounds {
                columns: Vec::new(),
                min: Vec::new(),
                max: Vec::new(),
            },
            save_path: self.save_path,
        };
        dataset.bounds = dataset.compute_bounds()?;
        tracing::info!(
            name = %dataset.name,
            train = dataset.train.n_rows(),
            validation = dataset.validation.n_rows(),
            test = dataset.test.n_rows(),
            classes = dataset.labels.n_classes(),
            "dataset loaded"
        );
        Ok(dataset)
    }
}

fn fill_missing_categories(features: &mut Table, roles: &ColumnRoles, literal: &str) {
    for name in roles.categories() {
        if let Some(column) = features.column_mut(&name) {
            for value in &mut column.values {
                if value.is_missing() {
                    *value = Value::text(literal);
                }
            }
        }
    }
}

impl Dataset {
    /// Start building a dataset with the given name and column roles.
    #[must_use]
    pub fn builder(name: impl Into<String>, roles: ColumnRoles) -> DatasetBuilder {
        DatasetBuilder {
            name: name.into(),
            roles,
            train: None,
            validation: None,
            test: None,
            unknown_categories: UnknownCategoryPolicy::default(),
            impute: ImputePolicy::default(),
            save_path: None,
        }
    }

    fn compute_bounds(&self) -> Result<NormalizationBounds> {
        let encoded = [&self.train, &self.validation, &self.test]
            .into_iter()
            .filter(|split| split.n_rows() > 0)
            .map(|split| self.encode_features(&split.features))
            .collect::<Result<Vec<_>>>()?;
        let refs: Vec<&NumericTable> = encoded.iter().collect();
        NormalizationBounds::compute(&refs)
    }

    //=========================================================================
    // Accessors
    //=========================================================================

    /// Dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column roles.
    #[must_use]
    pub fn roles(&self) -> &ColumnRoles {
        &self.roles
    }

    /// The categorical codec fitted on the training features.
    #[must_use]
    pub fn codec(&self) -> &CategoricalCodec {
        &self.codec
    }

    /// The label encoder.
    #[must_use]
    pub fn label_encoder(&self) -> &LabelEncoder {
        &self.labels
    }

    /// Normalization bounds.
    #[must_use]
    pub fn bounds(&self) -> &NormalizationBounds {
        &self.bounds
    }

    /// Directory used for synthetic persistence, if configured.
    #[must_use]
    pub fn save_path(&self) -> Option<&std::path::Path> {
        self.save_path.as_deref()
    }

    /// A real split.
    #[must_use]
    pub fn split(&self, kind: SplitKind) -> &Split {
        match kind {
            SplitKind::Train => &self.train,
            SplitKind::Validation => &self.validation,
            SplitKind::Test => &self.test,
        }
    }

    /// Features of a real split.
    #[must_use]
    pub fn real_features(&self, kind: SplitKind) -> &Table {
        &self.split(kind).features
    }

    /// Labels of a real split.
    #[must_use]
    pub fn real_labels(&self, kind: SplitKind) -> &Column {
        &self.split(kind).labels
    }

    /// The synthetic split, failing if none is attached.
    pub fn synthetic(&self) -> Result<&Split> {
        self.synthetic
            .as_ref()
            .ok_or_else(|| Error::MissingSynthetic(self.name.clone()))
    }

    /// Synthetic features.
    pub fn synthetic_features(&self) -> Result<&Table> {
        Ok(&self.synthetic()?.features)
    }

    /// Synthetic labels.
    pub fn synthetic_labels(&self) -> Result<&Column> {
        Ok(&self.synthetic()?.labels)
    }

    /// Whether a synthetic split is attached.
    #[must_use]
    pub fn has_synthetic(&self) -> bool {
        self.synthetic.is_some()
    }

    //=========================================================================
    // Queries
    //=========================================================================

    /// Feature names in column order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.train.features.column_names()
    }

    /// Number of features.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.train.features.n_cols()
    }

    /// Distinct training labels in order of first appearance.
    #[must_use]
    pub fn class_names(&self) -> Vec<Value> {
        self.train.labels.unique_in_order()
    }

    /// Number of distinct training labels.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.train.labels.distinct().len()
    }

    /// Training label counts, most frequent first.
    #[must_use]
    pub fn class_counts(&self) -> Vec<(Value, usize)> {
        self.train.class_counts()
    }

    /// Size of the smallest training class.
    #[must_use]
    pub fn min_class_count(&self) -> usize {
        self.class_counts().last().map_or(0, |(_, c)| *c)
    }

    /// Number of training rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.train.n_rows()
    }

    /// Train plus validation rows.
    #[must_use]
    pub fn train_samples(&self) -> usize {
        self.train.n_rows() + self.validation.n_rows()
    }

    /// Test rows.
    #[must_use]
    pub fn test_samples(&self) -> usize {
        self.test.n_rows()
    }

    /// Synthetic label counts, most frequent first.
    pub fn generated_class_counts(&self) -> Result<Vec<(Value, usize)>> {
        Ok(self.synthetic()?.class_counts())
    }

    /// Number of synthetic rows.
    pub fn generated_row_count(&self) -> Result<usize> {
        Ok(self.synthetic()?.n_rows())
    }

    /// Largest ratio of the majority class count to any class count.
    ///
    /// 0.0 when the training split has no labels.
    #[must_use]
    pub fn imbalance_ratio(&self) -> f64 {
        let counts = self.class_counts();
        match (counts.first(), counts.last()) {
            (Some((_, majority)), Some((_, minority))) => *majority as f64 / *minority as f64,
            _ => 0.0,
        }
    }

    /// Dataset summary.
    #[must_use]
    pub fn info(&self) -> DatasetInfo {
        DatasetInfo {
            name: self.name.clone(),
            imbalance: self.imbalance_ratio(),
            continuous: self.roles.continuous.len(),
            categorical: self.roles.categories().len(),
            train_samples: self.train_samples(),
            test_samples: self.test_samples(),
        }
    }

    /// Training features of one class.
    #[must_use]
    pub fn class_rows(&self, class: &Value) -> Table {
        self.train.features.take_rows(&self.train.class_indices(class))
    }

    /// Synthetic features of one class.
    pub fn synthetic_class_rows(&self, class: &Value) -> Result<Table> {
        let synthetic = self.synthetic()?;
        Ok(synthetic.features.take_rows(&synthetic.class_indices(class)))
    }

    /// `n` training rows of one class drawn without replacement.
    pub fn random_class_rows(&self, class: &Value, n: usize, seed: u64) -> Result<Table> {
        sample_class_rows(&self.train, class, n, seed)
    }

    /// `n` synthetic rows of one class drawn without replacement.
    pub fn random_synthetic_class_rows(&self, class: &Value, n: usize, seed: u64) -> Result<Table> {
        sample_class_rows(self.synthetic()?, class, n, seed)
    }

    //=========================================================================
    // Encoding
    //=========================================================================

    /// Impute and encode a feature table with the dataset's codec.
    pub fn encode_features(&self, features: &Table) -> Result<NumericTable> {
        FeatureEncoder::new(&self.codec, &self.roles)
            .with_policy(self.impute.clone())
            .encode(features)
    }

    /// Map encoded features back to their categories.
    pub fn decode_features(&self, encoded: &NumericTable) -> Result<Table> {
        self.codec.decode(&encoded.to_table()?)
    }

    /// Ordinal label codes.
    pub fn encode_labels(&self, labels: &Column) -> Result<Vec<usize>> {
        self.labels.encode(&labels.values)
    }

    /// Labels for ordinal codes.
    pub fn decode_labels(&self, codes: &[usize]) -> Result<Vec<Value>> {
        self.labels.decode(codes)
    }

    /// One-hot label matrix.
    pub fn one_hot_labels(&self, labels: &Column) -> Result<Matrix> {
        self.labels.one_hot(&labels.values)
    }

    /// Encode a split with its label code appended as the last column.
    pub fn encode_split(&self, split: &Split) -> Result<NumericTable> {
        let features = self.encode_features(&split.features)?;
        let codes = self.encode_labels(&split.labels)?;
        let mut columns: Vec<(String, Vec<f64>)> = features
            .names()
            .iter()
            .enumerate()
            .map(|(j, name)| (name.clone(), features.matrix().column(j)))
            .collect();
        columns.push((
            self.roles.label.clone(),
            codes.into_iter().map(|c| c as f64).collect(),
        ));
        NumericTable::from_columns(columns)
    }

    /// Training split and synthetic split, both encoded with the shared
    /// codec and label encoder.
    pub fn single_encoded_data(&self) -> Result<(NumericTable, NumericTable)> {
        let synthetic = self.synthetic()?;
        let real = self.encode_split(&self.train)?;
        let synthetic = self.encode_split(synthetic)?;
        Ok((real, synthetic))
    }

    /// Encode and min–max scale a feature table with the stored bounds.
    pub fn normalized_features(&self, features: &Table) -> Result<NumericTable> {
        self.bounds.normalize(&self.encode_features(features)?)
    }

    //=========================================================================
    // Mutations
    //=========================================================================

    /// Attach a synthetic split. Feature columns must match the training
    /// features (in any order; they are reordered to match).
    pub fn set_synthetic(&mut self, features: Table, labels: Column) -> Result<()> {
        self.roles.validate(&features)?;
        let features = features.select(&self.feature_names())?;
        let split = Split::new(features, labels)?;
        tracing::info!(rows = split.n_rows(), "attached synthetic data");
        self.synthetic = Some(split);
        Ok(())
    }

    /// Attach a synthetic table that still carries the label column.
    pub fn set_split_result(&mut self, mut data: Table) -> Result<()> {
        let idx = crate::table::import::find_header_index(&data.column_names(), &self.roles.label)
            .ok_or_else(|| Error::UnknownColumn(self.roles.label.clone()))?;
        let name = data.columns()[idx].name.clone();
        let mut labels = data.remove_column(&name)?;
        labels.name.clone_from(&self.roles.label);
        self.set_synthetic(data, labels)
    }

    /// Relabel every class in each value list to its key, in all real
    /// splits, then re-fit the label encoder.
    pub fn merge_classes(&mut self, merge: &BTreeMap<Value, Vec<Value>>) -> Result<()> {
        let relabel = |v: &Value| -> Result<Value> {
            Ok(merge
                .iter()
                .find(|(_, sources)| sources.contains(v))
                .map_or_else(|| v.clone(), |(target, _)| target.clone()))
        };
        for split in [&mut self.train, &mut self.validation, &mut self.test] {
            split.relabel(relabel)?;
        }
        self.refit_labels();
        Ok(())
    }

    /// Bin a numeric label into named right-closed intervals
    /// `(edges[i], edges[i + 1]]`, then re-fit the label encoder.
    pub fn create_bins(&mut self, edges: &[f64], names: &[String]) -> Result<()> {
        if edges.len() != names.len() + 1 || edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidConfig(format!(
                "{} increasing bin edges are needed for {} labels",
                names.len() + 1,
                names.len()
            )));
        }
        let label = self.roles.label.clone();
        let bin = |v: &Value| -> Result<Value> {
            let x = v.as_f64().ok_or_else(|| Error::NonNumeric {
                column: label.clone(),
                value: v.to_string(),
            })?;
            edges
                .windows(2)
                .position(|w| x > w[0] && x <= w[1])
                .map(|i| Value::text(names[i].clone()))
                .ok_or_else(|| Error::DegenerateInput(format!("label {x} is outside every bin")))
        };
        // relabel into copies so a failure leaves the dataset untouched
        let mut splits = [self.train.clone(), self.validation.clone(), self.test.clone()];
        for split in &mut splits {
            split.relabel(bin)?;
        }
        [self.train, self.validation, self.test] = splits;
        self.refit_labels();
        Ok(())
    }

    /// Remove a fraction of each listed class's training rows, chosen
    /// uniformly at random with the given seed.
    pub fn reduce_size(&mut self, percentages: &BTreeMap<Value, f64>, seed: u64) -> Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for (class, &percent) in percentages {
            if !(0.0..=1.0).contains(&percent) {
                return Err(Error::InvalidConfig(format!(
                    "removal fraction for class {class} must be in [0, 1], got {percent}"
                )));
            }
            let rows = self.train.class_indices(class);
            let n_remove = (rows.len() as f64 * percent) as usize;
            let chosen: BTreeSet<usize> = index::sample(&mut rng, rows.len(), n_remove)
                .into_iter()
                .map(|i| rows[i])
                .collect();
            self.train.remove_rows(&chosen);
            tracing::debug!(%class, removed = n_remove, "reduced class");
        }
        Ok(())
    }

    /// Drop the first `n` training rows.
    pub fn drop_first_n(&mut self, n: usize) {
        let rows: BTreeSet<usize> = (0..n.min(self.train.n_rows())).collect();
        self.train.remove_rows(&rows);
    }

    /// Repeat the training rows `multiplier` times.
    pub fn oversample(&mut self, multiplier: usize) -> Result<()> {
        if multiplier == 0 {
            return Err(Error::InvalidConfig("oversample multiplier must be at least 1".to_string()));
        }
        let n = self.train.n_rows();
        let rows: Vec<usize> = (0..multiplier).flat_map(|_| 0..n).collect();
        self.train = self.train.take_rows(&rows);
        Ok(())
    }

    fn refit_labels(&mut self) {
        self.labels = LabelEncoder::fit([
            self.train.labels.values.as_slice(),
            self.validation.labels.values.as_slice(),
            self.test.labels.values.as_slice(),
        ]);
        tracing::debug!(classes = self.labels.n_classes(), "re-fitted label encoder");
    }
}

fn sample_class_rows(split: &Split, class: &Value, n: usize, seed: u64) -> Result<Table> {
    let rows = split.class_indices(class);
    if rows.is_empty() || rows.len() < n {
        return Err(Error::EmptyPartition {
            class: class.to_string(),
            requested: n,
            available: rows.len(),
        });
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let chosen: Vec<usize> = index::sample(&mut rng, rows.len(), n)
        .into_iter()
        .map(|i| rows[i])
        .collect();
    Ok(split.features.take_rows(&chosen))
}
