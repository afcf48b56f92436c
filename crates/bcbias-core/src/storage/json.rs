//! Self-describing JSON rendition of a gridded dataset.
//!
//! A [`GridDataset`] mirrors the NetCDF data model the pipeline relies on:
//! named dimensions, variables laid out row-major over named dimensions, and
//! string attributes. Ordered maps keep serialized output byte-stable.

use super::{DatasetError, integral_date_keys};
use crate::domain::CorrectionResult;
use crate::modules::{DatasetStore, RawBias};
use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridDataset {
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub dimensions: BTreeMap<String, usize>,
    pub variables: BTreeMap<String, GridVariable>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridVariable {
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub values: Vec<f64>,
}

impl GridDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_dimension(mut self, name: &str, len: usize) -> Self {
        self.dimensions.insert(name.to_string(), len);
        self
    }

    pub fn with_variable(mut self, name: &str, dimensions: &[&str], values: Vec<f64>) -> Self {
        self.variables.insert(
            name.to_string(),
            GridVariable {
                dimensions: dimensions.iter().map(|dimension| dimension.to_string()).collect(),
                attributes: BTreeMap::new(),
                values,
            },
        );
        self
    }

    pub fn read(path: &Path) -> Result<Self, DatasetError> {
        let bytes = fs::read(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            message: source.to_string(),
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), DatasetError> {
        let mut bytes = serde_json::to_vec_pretty(self).map_err(|source| DatasetError::Write {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;
        bytes.push(b'\n');
        fs::write(path, bytes).map_err(|source| DatasetError::Write {
            path: path.to_path_buf(),
            message: source.to_string(),
        })
    }

    /// Dimension lengths of `variable`, checked against its value count.
    pub fn shape_of(&self, path: &Path, variable: &str) -> Result<Vec<usize>, DatasetError> {
        let entry = self.variable(path, variable)?;
        let shape = entry
            .dimensions
            .iter()
            .map(|dimension| {
                self.dimensions
                    .get(dimension)
                    .copied()
                    .ok_or_else(|| DatasetError::MissingDimension {
                        path: path.to_path_buf(),
                        variable: variable.to_string(),
                        dimension: dimension.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let expected = shape.iter().product::<usize>();
        if expected != entry.values.len() {
            return Err(DatasetError::ValueCount {
                path: path.to_path_buf(),
                variable: variable.to_string(),
                expected,
                found: entry.values.len(),
            });
        }
        Ok(shape)
    }

    fn variable(&self, path: &Path, variable: &str) -> Result<&GridVariable, DatasetError> {
        self.variables
            .get(variable)
            .ok_or_else(|| DatasetError::MissingVariable {
                path: path.to_path_buf(),
                variable: variable.to_string(),
            })
    }

    fn values_with_rank(
        &self,
        path: &Path,
        variable: &str,
        rank: usize,
    ) -> Result<(Vec<usize>, Vec<f64>), DatasetError> {
        let shape = self.shape_of(path, variable)?;
        if shape.len() != rank {
            return Err(DatasetError::Rank {
                path: path.to_path_buf(),
                variable: variable.to_string(),
                expected: rank,
                found: shape.len(),
            });
        }
        Ok((shape, self.variable(path, variable)?.values.clone()))
    }
}

/// [`DatasetStore`] over [`GridDataset`] JSON files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDatasetStore;

impl DatasetStore for JsonDatasetStore {
    fn read_bias(
        &self,
        path: &Path,
        bias_variable: &str,
        date_variable: &str,
    ) -> CorrectionResult<RawBias> {
        let dataset = GridDataset::read(path)?;
        let (shape, values) = dataset.values_with_rank(path, bias_variable, 3)?;
        let (_, raw_keys) = dataset.values_with_rank(path, date_variable, 1)?;

        let date_keys = integral_date_keys(path, raw_keys)?;

        let values = Array3::from_shape_vec((shape[0], shape[1], shape[2]), values).map_err(
            |source| DatasetError::Read {
                path: path.to_path_buf(),
                message: source.to_string(),
            },
        )?;
        Ok(RawBias { values, date_keys })
    }

    fn read_species(&self, path: &Path, variable: &str) -> CorrectionResult<Array4<f64>> {
        let dataset = GridDataset::read(path)?;
        let (shape, values) = dataset.values_with_rank(path, variable, 4)?;
        let field = Array4::from_shape_vec((shape[0], shape[1], shape[2], shape[3]), values)
            .map_err(|source| DatasetError::Read {
                path: path.to_path_buf(),
                message: source.to_string(),
            })?;
        Ok(field)
    }

    fn write_corrected(
        &self,
        source: &Path,
        destination: &Path,
        variable: &str,
        field: &Array4<f64>,
    ) -> CorrectionResult<()> {
        let mut dataset = GridDataset::read(source)?;
        let shape = dataset.shape_of(source, variable)?;
        if shape != field.shape() {
            return Err(DatasetError::ShapeMismatch {
                path: source.to_path_buf(),
                variable: variable.to_string(),
                expected: field.shape().to_vec(),
                found: shape,
            }
            .into());
        }

        if let Some(entry) = dataset.variables.get_mut(variable) {
            entry.values = field.iter().copied().collect();
        }
        dataset.write(destination)?;
        Ok(())
    }
}
