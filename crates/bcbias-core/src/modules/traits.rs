use crate::domain::CorrectionResult;
use ndarray::{Array3, Array4};
use std::path::Path;

/// Unscaled bias values as stored on disk, with one date key per leading index.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBias {
    pub values: Array3<f64>,
    pub date_keys: Vec<i64>,
}

/// Read/write access to the gridded datasets consumed and produced by the
/// correction pipeline.
///
/// Implementations must be shareable across worker threads; every call opens
/// and closes its own file handles.
pub trait DatasetStore: Send + Sync {
    fn read_bias(
        &self,
        path: &Path,
        bias_variable: &str,
        date_variable: &str,
    ) -> CorrectionResult<RawBias>;

    /// Reads a `[time, level, lat, lon]` field.
    fn read_species(&self, path: &Path, variable: &str) -> CorrectionResult<Array4<f64>>;

    /// Writes a copy of `source` to `destination` in which only `variable`
    /// holds `field`. Dimensions, other variables and attributes are kept.
    fn write_corrected(
        &self,
        source: &Path,
        destination: &Path,
        variable: &str,
        field: &Array4<f64>,
    ) -> CorrectionResult<()>;
}

#[cfg(test)]
mod tests {
    use super::{DatasetStore, RawBias};
    use crate::domain::{CorrectionError, CorrectionErrorCategory, CorrectionResult};
    use ndarray::Array4;
    use std::path::Path;

    struct UnavailableStore;

    impl DatasetStore for UnavailableStore {
        fn read_bias(&self, path: &Path, _: &str, _: &str) -> CorrectionResult<RawBias> {
            Err(CorrectionError::io_system(
                "IO.BIAS_READ",
                format!("'{}' is unavailable", path.display()),
            ))
        }

        fn read_species(&self, _: &Path, _: &str) -> CorrectionResult<Array4<f64>> {
            Ok(Array4::zeros((1, 1, 1, 1)))
        }

        fn write_corrected(
            &self,
            _: &Path,
            _: &Path,
            _: &str,
            _: &Array4<f64>,
        ) -> CorrectionResult<()> {
            Ok(())
        }
    }

    #[test]
    fn store_is_usable_as_trait_object() {
        let store: &dyn DatasetStore = &UnavailableStore;
        let error = store
            .read_bias(Path::new("bias.nc"), "Bias", "time")
            .expect_err("store should fail");
        assert_eq!(error.category(), CorrectionErrorCategory::IoSystemError);
        assert_eq!(error.code(), "IO.BIAS_READ");

        let field = store
            .read_species(Path::new("bc.nc4"), "SpeciesBC_CH4")
            .expect("species should read");
        assert_eq!(field.shape(), &[1, 1, 1, 1]);
    }
}
