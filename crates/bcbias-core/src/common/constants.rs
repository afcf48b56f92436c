//! Fixed values of the boundary-condition bias correction workflow.

/// Converts stored bias values (ppb) into the mole-fraction units of the species field.
pub const BIAS_SCALE_FACTOR: f64 = 1.0e-9;

/// Vertical levels in a GEOS-Chem boundary-condition species field.
pub const BOUNDARY_LEVEL_COUNT: usize = 47;

pub const DEFAULT_SPECIES_VARIABLE: &str = "SpeciesBC_CH4";
pub const DEFAULT_BIAS_VARIABLE: &str = "Bias";
pub const DEFAULT_DATE_VARIABLE: &str = "time";
pub const DEFAULT_FILE_PATTERN: &str = "GEOSChem.BoundaryConditions*.nc4";
pub const DEFAULT_BIAS_RELATIVE_PATH: &str = "step3/Bias_4x5_dk_2_updated.nc";
pub const DEFAULT_OUTPUT_SUBDIR: &str = "smoothed-boundary-conditions";

/// Characters separating the tokens of a boundary-condition file name.
pub const DATE_KEY_DELIMITERS: [char; 2] = ['.', '_'];

/// Token holding the date in `GEOSChem.BoundaryConditions.YYYYMMDD_HHMMz.nc4`.
pub const DATE_KEY_TOKEN_INDEX: usize = 2;
