//! Dataset backends behind [`DatasetStore`].

pub mod json;
#[cfg(feature = "netcdf")]
pub mod netcdf_store;

pub use json::{GridDataset, GridVariable, JsonDatasetStore};
#[cfg(feature = "netcdf")]
pub use netcdf_store::NetCdfStore;

use crate::common::config::DatasetFormat;
use crate::domain::{CorrectionError, CorrectionResult};
use crate::modules::DatasetStore;
use std::path::{Path, PathBuf};

/// Date keys are stored as floating values in both backends; only integral
/// finite values are accepted.
pub(crate) fn integral_date_keys(
    path: &Path,
    values: Vec<f64>,
) -> Result<Vec<i64>, DatasetError> {
    values
        .into_iter()
        .map(|value| {
            if value.is_finite() && value.fract() == 0.0 {
                Ok(value as i64)
            } else {
                Err(DatasetError::NonIntegerKey {
                    path: path.to_path_buf(),
                    value,
                })
            }
        })
        .collect()
}

pub fn store_for_format(format: DatasetFormat) -> CorrectionResult<Box<dyn DatasetStore>> {
    match format {
        DatasetFormat::Json => Ok(Box::new(JsonDatasetStore)),
        #[cfg(feature = "netcdf")]
        DatasetFormat::NetCdf => Ok(Box::new(NetCdfStore)),
        #[cfg(not(feature = "netcdf"))]
        DatasetFormat::NetCdf => Err(CorrectionError::input_validation(
            "INPUT.FORMAT_UNAVAILABLE",
            "NetCDF support is not compiled in; rebuild with `--features netcdf` or use the json format",
        )),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset '{}': {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("failed to write dataset '{}': {message}", path.display())]
    Write { path: PathBuf, message: String },
    #[error("dataset '{}' has no variable '{variable}'", path.display())]
    MissingVariable { path: PathBuf, variable: String },
    #[error("dataset '{}' does not define dimension '{dimension}' used by '{variable}'", path.display())]
    MissingDimension {
        path: PathBuf,
        variable: String,
        dimension: String,
    },
    #[error("variable '{variable}' in '{}' has {found} dimensions; expected {expected}", path.display())]
    Rank {
        path: PathBuf,
        variable: String,
        expected: usize,
        found: usize,
    },
    #[error("variable '{variable}' in '{}' holds {found} values; its dimensions require {expected}", path.display())]
    ValueCount {
        path: PathBuf,
        variable: String,
        expected: usize,
        found: usize,
    },
    #[error("variable '{variable}' in '{}' has shape {found:?}; the corrected field has shape {expected:?}", path.display())]
    ShapeMismatch {
        path: PathBuf,
        variable: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("date key {value} in '{}' is not an integer", path.display())]
    NonIntegerKey { path: PathBuf, value: f64 },
}

impl From<DatasetError> for CorrectionError {
    fn from(error: DatasetError) -> Self {
        let message = error.to_string();
        match error {
            DatasetError::Read { .. } => CorrectionError::io_system("IO.DATASET_READ", message),
            DatasetError::Write { .. } => CorrectionError::io_system("IO.OUTPUT_WRITE", message),
            DatasetError::MissingVariable { .. }
            | DatasetError::MissingDimension { .. }
            | DatasetError::Rank { .. }
            | DatasetError::ValueCount { .. }
            | DatasetError::ShapeMismatch { .. }
            | DatasetError::NonIntegerKey { .. } => {
                CorrectionError::data_integrity("DATA.DATASET_LAYOUT", message)
            }
        }
    }
}
