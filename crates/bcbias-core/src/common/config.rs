//! Run configuration for the bias correction pipeline.
//!
//! A settings file names the working directory and the boundary-condition
//! cache; every other location defaults relative to the working directory.
//! The resolved [`CorrectionConfig`] is passed explicitly into the pipeline.

use super::constants::{
    BIAS_SCALE_FACTOR, BOUNDARY_LEVEL_COUNT, DEFAULT_BIAS_RELATIVE_PATH, DEFAULT_BIAS_VARIABLE,
    DEFAULT_DATE_VARIABLE, DEFAULT_FILE_PATTERN, DEFAULT_OUTPUT_SUBDIR, DEFAULT_SPECIES_VARIABLE,
};
use crate::domain::{CorrectionError, CorrectionResult, ExecutionMode};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DatasetFormat {
    #[default]
    #[serde(rename = "netcdf")]
    NetCdf,
    #[serde(rename = "json")]
    Json,
}

impl DatasetFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NetCdf => "netcdf",
            Self::Json => "json",
        }
    }
}

impl Display for DatasetFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for DatasetFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "netcdf" | "nc" | "nc4" => Ok(Self::NetCdf),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionConfig {
    pub workdir: PathBuf,
    pub input_dir: PathBuf,
    pub bias_path: PathBuf,
    pub output_dir: PathBuf,
    pub file_pattern: String,
    pub species_variable: String,
    pub bias_variable: String,
    pub date_variable: String,
    pub scale_factor: f64,
    /// Expected vertical level count; `None` accepts any.
    pub level_count: Option<usize>,
    pub format: DatasetFormat,
    pub execution_mode: ExecutionMode,
}

impl CorrectionConfig {
    pub fn new(workdir: impl Into<PathBuf>, input_dir: impl Into<PathBuf>) -> Self {
        let workdir = workdir.into();
        Self {
            bias_path: workdir.join(DEFAULT_BIAS_RELATIVE_PATH),
            output_dir: workdir.join(DEFAULT_OUTPUT_SUBDIR),
            input_dir: input_dir.into(),
            workdir,
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            species_variable: DEFAULT_SPECIES_VARIABLE.to_string(),
            bias_variable: DEFAULT_BIAS_VARIABLE.to_string(),
            date_variable: DEFAULT_DATE_VARIABLE.to_string(),
            scale_factor: BIAS_SCALE_FACTOR,
            level_count: Some(BOUNDARY_LEVEL_COUNT),
            format: DatasetFormat::default(),
            execution_mode: ExecutionMode::default(),
        }
    }

    pub fn validate(&self) -> CorrectionResult<()> {
        let checks = [
            ("filePattern", self.file_pattern.as_str()),
            ("speciesVariable", self.species_variable.as_str()),
            ("biasVariable", self.bias_variable.as_str()),
            ("dateVariable", self.date_variable.as_str()),
        ];
        if let Some((name, _)) = checks.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::EmptySetting(*name).into());
        }
        if !self.scale_factor.is_finite() || self.scale_factor == 0.0 {
            return Err(ConfigError::InvalidScaleFactor(self.scale_factor).into());
        }
        if self.level_count == Some(0) {
            return Err(ConfigError::InvalidLevelCount.into());
        }
        Ok(())
    }
}

/// On-disk settings. `workdir` and `gccache` are required; the remaining keys
/// override the defaults of [`CorrectionConfig::new`]. Keys belonging to other
/// workflow steps sharing the same file are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub workdir: PathBuf,
    pub gccache: PathBuf,
    #[serde(default)]
    pub bias_file: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub file_pattern: Option<String>,
    #[serde(default)]
    pub species_variable: Option<String>,
    #[serde(default)]
    pub bias_variable: Option<String>,
    #[serde(default)]
    pub date_variable: Option<String>,
    #[serde(default)]
    pub scale_factor: Option<f64>,
    #[serde(default)]
    pub level_count: Option<usize>,
    #[serde(default)]
    pub format: Option<DatasetFormat>,
    #[serde(default)]
    pub execution_mode: Option<ExecutionMode>,
}

impl ConfigFile {
    /// Resolves relative paths against `base_dir`.
    pub fn resolve(self, base_dir: &Path) -> CorrectionConfig {
        let workdir = resolve_path(base_dir, &self.workdir);
        let mut config = CorrectionConfig::new(&workdir, resolve_path(base_dir, &self.gccache));

        if let Some(bias_file) = self.bias_file {
            config.bias_path = resolve_path(&workdir, &bias_file);
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = resolve_path(&workdir, &output_dir);
        }
        if let Some(pattern) = self.file_pattern {
            config.file_pattern = pattern;
        }
        if let Some(variable) = self.species_variable {
            config.species_variable = variable;
        }
        if let Some(variable) = self.bias_variable {
            config.bias_variable = variable;
        }
        if let Some(variable) = self.date_variable {
            config.date_variable = variable;
        }
        if let Some(scale_factor) = self.scale_factor {
            config.scale_factor = scale_factor;
        }
        if let Some(level_count) = self.level_count {
            config.level_count = Some(level_count);
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(mode) = self.execution_mode {
            config.execution_mode = mode;
        }
        config
    }

    /// Parses a settings file, as YAML for `.yml`/`.yaml` and JSON otherwise.
    pub fn read(path: &Path) -> CorrectionResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_yaml = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                extension.eq_ignore_ascii_case("yml") || extension.eq_ignore_ascii_case("yaml")
            });

        let raw = if is_yaml {
            serde_yaml::from_str::<Self>(&content).map_err(|source| ConfigError::ParseYaml {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_json::from_str::<Self>(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };
        Ok(raw)
    }
}

/// Directory that relative `workdir`/`gccache` entries of `path` resolve against.
pub fn config_base_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

pub fn load_config_file(path: &Path) -> CorrectionResult<CorrectionConfig> {
    load_config_file_with_workdir(path, None)
}

/// Like [`load_config_file`], but `workdir` replaces the file's `workdir`
/// before any workdir-relative location is derived.
pub fn load_config_file_with_workdir(
    path: &Path,
    workdir: Option<&Path>,
) -> CorrectionResult<CorrectionConfig> {
    let mut raw = ConfigFile::read(path)?;
    if let Some(workdir) = workdir {
        raw.workdir = workdir.to_path_buf();
    }
    let config = raw.resolve(config_base_dir(path));
    config.validate()?;
    Ok(config)
}

fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to parse config '{}': {source}", path.display())]
    ParseYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("setting '{0}' must not be empty")]
    EmptySetting(&'static str),
    #[error("scale factor {0} must be finite and non-zero")]
    InvalidScaleFactor(f64),
    #[error("level count must be positive")]
    InvalidLevelCount,
    #[error("unknown dataset format '{0}'; expected 'netcdf' or 'json'")]
    UnknownFormat(String),
}

impl From<ConfigError> for CorrectionError {
    fn from(error: ConfigError) -> Self {
        let message = error.to_string();
        match error {
            ConfigError::Read { .. } => CorrectionError::io_system("IO.CONFIG", message),
            ConfigError::Parse { .. }
            | ConfigError::ParseYaml { .. }
            | ConfigError::EmptySetting(_)
            | ConfigError::InvalidScaleFactor(_)
            | ConfigError::InvalidLevelCount
            | ConfigError::UnknownFormat(_) => {
                CorrectionError::input_validation("INPUT.CONFIG", message)
            }
        }
    }
}
