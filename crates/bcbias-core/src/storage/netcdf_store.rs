//! NetCDF backend built on the `netcdf` crate (libnetcdf).

use super::{DatasetError, integral_date_keys};
use crate::domain::CorrectionResult;
use crate::modules::{DatasetStore, RawBias};
use ndarray::{Array3, Array4};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfStore;

impl NetCdfStore {
    fn open(path: &Path) -> Result<netcdf::File, DatasetError> {
        netcdf::open(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            message: source.to_string(),
        })
    }

    fn read_variable<T>(
        file: &netcdf::File,
        path: &Path,
        variable: &str,
        rank: usize,
    ) -> Result<(Vec<usize>, Vec<T>), DatasetError>
    where
        T: netcdf::NcTypeDescriptor + Copy,
    {
        let handle = file
            .variable(variable)
            .ok_or_else(|| DatasetError::MissingVariable {
                path: path.to_path_buf(),
                variable: variable.to_string(),
            })?;
        let shape = handle
            .dimensions()
            .iter()
            .map(|dimension| dimension.len())
            .collect::<Vec<_>>();
        if shape.len() != rank {
            return Err(DatasetError::Rank {
                path: path.to_path_buf(),
                variable: variable.to_string(),
                expected: rank,
                found: shape.len(),
            });
        }

        let values = handle
            .get_values::<T, _>(..)
            .map_err(|source| DatasetError::Read {
                path: path.to_path_buf(),
                message: format!("variable '{}': {}", variable, source),
            })?;
        Ok((shape, values))
    }
}

impl DatasetStore for NetCdfStore {
    fn read_bias(
        &self,
        path: &Path,
        bias_variable: &str,
        date_variable: &str,
    ) -> CorrectionResult<RawBias> {
        let file = Self::open(path)?;
        let (shape, values) = Self::read_variable::<f64>(&file, path, bias_variable, 3)?;
        let (_, raw_keys) = Self::read_variable::<f64>(&file, path, date_variable, 1)?;
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
        let file = Self::open(path)?;
        let (shape, values) = Self::read_variable::<f64>(&file, path, variable, 4)?;
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
        let write_error = |message: String| DatasetError::Write {
            path: destination.to_path_buf(),
            message,
        };

        fs::copy(source, destination).map_err(|error| {
            write_error(format!("copy from '{}': {}", source.display(), error))
        })?;
        make_owner_writable(destination)
            .map_err(|error| write_error(format!("make staged copy writable: {}", error)))?;

        let mut file = netcdf::append(destination).map_err(|error| write_error(error.to_string()))?;
        {
            let mut handle =
                file.variable_mut(variable)
                    .ok_or_else(|| DatasetError::MissingVariable {
                        path: source.to_path_buf(),
                        variable: variable.to_string(),
                    })?;
            let shape = handle
                .dimensions()
                .iter()
                .map(|dimension| dimension.len())
                .collect::<Vec<_>>();
            if shape != field.shape() {
                return Err(DatasetError::ShapeMismatch {
                    path: source.to_path_buf(),
                    variable: variable.to_string(),
                    expected: field.shape().to_vec(),
                    found: shape,
                }
                .into());
            }

            let contiguous = field.as_standard_layout();
            let values = contiguous
                .as_slice()
                .ok_or_else(|| write_error("corrected field is not contiguous".to_string()))?;
            handle
                .put_values(values, ..)
                .map_err(|error| write_error(format!("variable '{}': {}", variable, error)))?;
        }
        file.close().map_err(|error| write_error(error.to_string()))?;
        Ok(())
    }
}

/// `fs::copy` carries the source's mode over, so a read-only input would
/// leave a copy that `netcdf::append` cannot open.
fn make_owner_writable(path: &Path) -> std::io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)
}
