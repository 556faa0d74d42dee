//! Synthetic data persistence as `X_gen_<generator>.csv` / `y_gen_<generator>.csv`.

use std::path::PathBuf;

use crate::dataset::{Dataset, DatasetConfig};
use crate::error::{Error, Result};
use crate::table::{Table, read_csv, write_csv};

impl Dataset {
    /// Directory holding synthetic files: the configured save path, with
    /// `_<tuner>` appended (lowercased) when a tuner is given.
    pub fn synthetic_dir(&self, tuner: Option<&str>) -> Result<PathBuf> {
        let base = self
            .save_path()
            .ok_or_else(|| Error::InvalidConfig(format!("dataset {} has no save_path", self.name())))?;
        Ok(match tuner {
            Some(tuner) if !tuner.is_empty() => {
                let mut name = base.as_os_str().to_os_string();
                name.push(format!("_{}", tuner.to_lowercase()));
                PathBuf::from(name)
            }
            _ => base.to_path_buf(),
        })
    }

    /// Write the attached synthetic split and return the directory used.
    pub fn save_synthetic(&self, generator: &str, tuner: Option<&str>) -> Result<PathBuf> {
        let synthetic = self.synthetic()?;
        let dir = self.synthetic_dir(tuner)?;
        std::fs::create_dir_all(&dir)?;

        write_csv(&synthetic.features, dir.join(format!("X_gen_{generator}.csv")))?;
        let labels = Table::new(vec![synthetic.labels.clone()])?;
        write_csv(&labels, dir.join(format!("y_gen_{generator}.csv")))?;

        tracing::info!(generator, dir = %dir.display(), "saved synthetic data");
        Ok(dir)
    }

    /// Read a previously saved synthetic split and attach it.
    pub fn load_synthetic(&mut self, generator: &str, tuner: Option<&str>) -> Result<()> {
        let dir = self.synthetic_dir(tuner)?;
        let features = read_csv(dir.join(format!("X_gen_{generator}.csv")))?;
        let labels = DatasetConfig::label_column(
            read_csv(dir.join(format!("y_gen_{generator}.csv")))?,
            &self.roles().label,
        )?;

        tracing::info!(generator, dir = %dir.display(), "loaded synthetic data");
        self.set_synthetic(features, labels)
    }
}
