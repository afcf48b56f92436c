use super::traits::{DatasetStore, RawBias};
use crate::domain::{CorrectionError, CorrectionResult, DateKey};
use ndarray::{Array3, ArrayView2, Axis};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

/// Scaled bias corrections indexed by date key.
///
/// Immutable after construction. `corrections[i]` is the `[lat, lon]` field
/// for `date_keys[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BiasTable {
    date_keys: Vec<DateKey>,
    corrections: Array3<f64>,
}

impl BiasTable {
    pub fn load(
        store: &dyn DatasetStore,
        path: &Path,
        bias_variable: &str,
        date_variable: &str,
        scale_factor: f64,
    ) -> CorrectionResult<Self> {
        let raw = store.read_bias(path, bias_variable, date_variable)?;
        let table = Self::from_raw(raw, scale_factor).map_err(|error| {
            CorrectionError::data_integrity(
                error.code(),
                format!("bias dataset '{}': {}", path.display(), error.message()),
            )
        })?;

        let (lat, lon) = table.grid_shape();
        info!(
            path = %path.display(),
            entries = table.len(),
            lat,
            lon,
            "loaded bias table"
        );
        let duplicates = table.duplicate_keys();
        if !duplicates.is_empty() {
            warn!(
                path = %path.display(),
                duplicates = ?duplicates,
                "bias table repeats date keys; lookups use the first entry"
            );
        }
        Ok(table)
    }

    /// Builds the table from unscaled values, multiplying each by `scale_factor`.
    pub fn from_raw(raw: RawBias, scale_factor: f64) -> CorrectionResult<Self> {
        let entry_count = raw.values.len_of(Axis(0));
        if entry_count != raw.date_keys.len() {
            return Err(CorrectionError::data_integrity(
                "DATA.BIAS_SHAPE",
                format!(
                    "bias array has {} entries along its first dimension but {} date keys",
                    entry_count,
                    raw.date_keys.len()
                ),
            ));
        }

        Ok(Self {
            date_keys: raw.date_keys.into_iter().map(DateKey::new).collect(),
            corrections: raw.values.mapv(|value| value * scale_factor),
        })
    }

    /// Returns the correction at the first index whose key equals `key`.
    pub fn lookup(&self, key: DateKey) -> Option<ArrayView2<'_, f64>> {
        self.index_of(key)
            .map(|index| self.corrections.index_axis(Axis(0), index))
    }

    pub fn index_of(&self, key: DateKey) -> Option<usize> {
        self.date_keys.iter().position(|candidate| *candidate == key)
    }

    pub fn date_keys(&self) -> &[DateKey] {
        &self.date_keys
    }

    /// `(lat, lon)` extents shared by every correction field.
    pub fn grid_shape(&self) -> (usize, usize) {
        let shape = self.corrections.shape();
        (shape[1], shape[2])
    }

    pub fn len(&self) -> usize {
        self.date_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.date_keys.is_empty()
    }

    pub fn duplicate_keys(&self) -> Vec<DateKey> {
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for key in &self.date_keys {
            if !seen.insert(*key) {
                duplicates.insert(*key);
            }
        }
        duplicates.into_iter().collect()
    }
}
