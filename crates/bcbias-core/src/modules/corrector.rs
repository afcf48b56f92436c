use crate::common::constants::BOUNDARY_LEVEL_COUNT;
use crate::domain::{CorrectionError, CorrectionResult};
use ndarray::{Array4, ArrayView2};

/// Subtracts one `[lat, lon]` correction from every `(time, level)` plane of
/// a `[time, level, lat, lon]` species field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelBroadcastCorrector {
    expected_levels: Option<usize>,
}

impl Default for LevelBroadcastCorrector {
    fn default() -> Self {
        Self::new(Some(BOUNDARY_LEVEL_COUNT))
    }
}

impl LevelBroadcastCorrector {
    pub const fn new(expected_levels: Option<usize>) -> Self {
        Self { expected_levels }
    }

    pub const fn expected_levels(&self) -> Option<usize> {
        self.expected_levels
    }

    /// Corrects `field` in place. The field is left untouched when the shape
    /// checks fail.
    pub fn apply(
        &self,
        field: &mut Array4<f64>,
        correction: ArrayView2<'_, f64>,
    ) -> CorrectionResult<()> {
        self.check_shapes(field, correction)?;
        *field -= &correction;
        Ok(())
    }

    pub fn apply_owned(
        &self,
        mut field: Array4<f64>,
        correction: ArrayView2<'_, f64>,
    ) -> CorrectionResult<Array4<f64>> {
        self.apply(&mut field, correction)?;
        Ok(field)
    }

    fn check_shapes(
        &self,
        field: &Array4<f64>,
        correction: ArrayView2<'_, f64>,
    ) -> CorrectionResult<()> {
        let field_shape = field.shape();
        let correction_shape = correction.shape();

        if field_shape[2..] != correction_shape[..] {
            return Err(CorrectionError::data_integrity(
                "DATA.GRID_MISMATCH",
                format!(
                    "correction grid {}x{} does not match species grid {}x{}",
                    correction_shape[0], correction_shape[1], field_shape[2], field_shape[3]
                ),
            ));
        }

        if let Some(expected) = self.expected_levels {
            if field_shape[1] != expected {
                return Err(CorrectionError::data_integrity(
                    "DATA.LEVEL_COUNT",
                    format!(
                        "species field has {} vertical levels; expected {}",
                        field_shape[1], expected
                    ),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LevelBroadcastCorrector;
    use crate::domain::CorrectionErrorCategory;
    use ndarray::{Array2, Array4, array};

    #[test]
    fn uniform_field_minus_uniform_correction() {
        let field = Array4::from_elem((1, 47, 2, 2), 10.0);
        let correction = array![[1.0, 1.0], [1.0, 1.0]];

        let corrected = LevelBroadcastCorrector::default()
            .apply_owned(field, correction.view())
            .expect("correction should apply");

        assert_eq!(corrected.shape(), &[1, 47, 2, 2]);
        assert!(corrected.iter().all(|value| *value == 9.0));
    }

    #[test]
    fn correction_is_identical_across_time_and_level() {
        let (times, levels, lat, lon) = (3, 4, 2, 3);
        let original = Array4::from_shape_fn((times, levels, lat, lon), |(t, l, i, j)| {
            100.0 * t as f64 + 10.0 * l as f64 + i as f64 * 0.5 + j as f64 * 0.25
        });
        let correction = Array2::from_shape_fn((lat, lon), |(i, j)| (i * lon + j) as f64 * 0.1 - 0.3);

        let corrected = LevelBroadcastCorrector::new(Some(levels))
            .apply_owned(original.clone(), correction.view())
            .expect("correction should apply");

        for ((t, l, i, j), value) in corrected.indexed_iter() {
            assert_eq!(*value, original[[t, l, i, j]] - correction[[i, j]]);
        }
    }

    #[test]
    fn grid_mismatch_is_fatal_and_leaves_field_untouched() {
        let mut field = Array4::from_elem((1, 47, 2, 2), 10.0);
        let correction = Array2::<f64>::ones((2, 3));

        let error = LevelBroadcastCorrector::default()
            .apply(&mut field, correction.view())
            .expect_err("mismatched grid should fail");

        assert_eq!(error.category(), CorrectionErrorCategory::DataIntegrityError);
        assert_eq!(error.code(), "DATA.GRID_MISMATCH");
        assert_eq!(
            error.message(),
            "correction grid 2x3 does not match species grid 2x2"
        );
        assert!(field.iter().all(|value| *value == 10.0));
    }

    #[test]
    fn transposed_grid_is_rejected() {
        let mut field = Array4::zeros((1, 2, 3, 2));
        let correction = Array2::<f64>::zeros((2, 3));
        assert!(
            LevelBroadcastCorrector::new(None)
                .apply(&mut field, correction.view())
                .is_err()
        );
    }

    #[test]
    fn unexpected_level_count_is_rejected() {
        let mut field = Array4::zeros((1, 72, 2, 2));
        let correction = Array2::<f64>::zeros((2, 2));

        let error = LevelBroadcastCorrector::default()
            .apply(&mut field, correction.view())
            .expect_err("72 levels should fail against the 47-level default");
        assert_eq!(error.code(), "DATA.LEVEL_COUNT");
    }

    #[test]
    fn unchecked_level_count_accepts_any_depth() {
        let field = Array4::from_elem((2, 5, 1, 1), 4.0);
        let correction = array![[1.5]];
        let corrected = LevelBroadcastCorrector::new(None)
            .apply_owned(field, correction.view())
            .expect("any level count should be accepted");
        assert!(corrected.iter().all(|value| *value == 2.5));
    }
}
