//! Date keys derived from boundary-condition file names.
//!
//! The name is split on every delimiter character and the token at
//! `token_index` is parsed as a signed integer. For the GEOS-Chem convention
//! `GEOSChem.BoundaryConditions.20160101_0000z.nc4` the tokens are
//! `["GEOSChem", "BoundaryConditions", "20160101", "0000z", "nc4"]`, so the
//! default index 2 yields `20160101`. Empty tokens produced by adjacent
//! delimiters keep their position.

use crate::common::constants::{DATE_KEY_DELIMITERS, DATE_KEY_TOKEN_INDEX};
use crate::domain::{CorrectionError, CorrectionResult, DateKey};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateKeyExtractor {
    delimiters: Vec<char>,
    token_index: usize,
}

impl Default for DateKeyExtractor {
    fn default() -> Self {
        Self::new(&DATE_KEY_DELIMITERS, DATE_KEY_TOKEN_INDEX)
    }
}

impl DateKeyExtractor {
    pub fn new(delimiters: &[char], token_index: usize) -> Self {
        Self {
            delimiters: delimiters.to_vec(),
            token_index,
        }
    }

    pub fn token_index(&self) -> usize {
        self.token_index
    }

    pub fn extract(&self, file_name: &str) -> CorrectionResult<DateKey> {
        let token = file_name
            .split(|character| self.delimiters.contains(&character))
            .nth(self.token_index)
            .ok_or_else(|| {
                CorrectionError::parse(
                    "PARSE.DATE_KEY",
                    format!(
                        "file name '{}' has no token at position {}",
                        file_name, self.token_index
                    ),
                )
            })?;

        token.parse::<i64>().map(DateKey::new).map_err(|_| {
            CorrectionError::parse(
                "PARSE.DATE_KEY",
                format!(
                    "token '{}' at position {} of '{}' is not an integer date key",
                    token, self.token_index, file_name
                ),
            )
        })
    }

    /// Extracts from the final path component, ignoring parent directories.
    pub fn extract_from_path(&self, path: &Path) -> CorrectionResult<DateKey> {
        let file_name = path.file_name().and_then(|name| name.to_str()).ok_or_else(|| {
            CorrectionError::parse(
                "PARSE.DATE_KEY",
                format!("path '{}' has no UTF-8 file name", path.display()),
            )
        })?;
        self.extract(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::DateKeyExtractor;
    use crate::domain::{CorrectionErrorCategory, DateKey};
    use std::path::Path;

    #[test]
    fn default_rule_reads_geoschem_date_token() {
        let extractor = DateKeyExtractor::default();
        let key = extractor
            .extract("GEOSChem.BoundaryConditions.20160101_0000z.nc4")
            .expect("key should parse");
        assert_eq!(key, DateKey::new(20160101));
    }

    #[test]
    fn underscore_and_dot_are_interchangeable_delimiters() {
        let extractor = DateKeyExtractor::default();
        assert_eq!(
            extractor.extract("GEOSChem_BoundaryConditions_20160301.nc4").ok(),
            Some(DateKey::new(20160301))
        );
    }

    #[test]
    fn path_components_are_ignored() {
        let extractor = DateKeyExtractor::default();
        let key = extractor
            .extract_from_path(Path::new(
                "/cache/run.v2/GEOSChem.BoundaryConditions.20160201_0000z.nc4",
            ))
            .expect("key should parse from the file name");
        assert_eq!(key.value(), 20160201);
    }

    #[test]
    fn non_integer_token_is_parse_error() {
        let extractor = DateKeyExtractor::default();
        let error = extractor
            .extract("GEOSChem.BoundaryConditions.latest_0000z.nc4")
            .expect_err("non-numeric token should fail");
        assert_eq!(error.category(), CorrectionErrorCategory::ParseError);
        assert_eq!(error.code(), "PARSE.DATE_KEY");
        assert!(error.message().contains("'latest'"));
    }

    #[test]
    fn short_name_is_parse_error() {
        let extractor = DateKeyExtractor::default();
        let error = extractor
            .extract("bias.nc")
            .expect_err("missing token should fail");
        assert_eq!(error.category(), CorrectionErrorCategory::ParseError);
    }

    #[test]
    fn empty_token_from_adjacent_delimiters_is_not_skipped() {
        let extractor = DateKeyExtractor::default();
        assert!(extractor
            .extract("GEOSChem.BoundaryConditions..20160101.nc4")
            .is_err());
    }

    #[test]
    fn custom_rule_changes_position_and_delimiters() {
        let extractor = DateKeyExtractor::new(&['-'], 1);
        assert_eq!(
            extractor.extract("bc-20170615-v2.json").ok(),
            Some(DateKey::new(20170615))
        );
        assert_eq!(extractor.token_index(), 1);
    }
}
