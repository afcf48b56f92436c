use crate::domain::{CorrectionError, CorrectionResult};
use globset::Glob;
use std::fs;
use std::path::{Path, PathBuf};

/// Lists regular files directly under `input_dir` whose names match `pattern`,
/// sorted by file name.
pub fn discover_inputs(input_dir: &Path, pattern: &str) -> CorrectionResult<Vec<PathBuf>> {
    let matcher = Glob::new(pattern)
        .map_err(|source| DiscoveryError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();

    let entries = fs::read_dir(input_dir).map_err(|source| DiscoveryError::ReadDirectory {
        path: input_dir.to_path_buf(),
        source,
    })?;

    let mut inputs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::ReadDirectory {
            path: input_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if entry
            .file_name()
            .to_str()
            .is_some_and(|name| matcher.is_match(name))
        {
            inputs.push(path);
        }
    }

    sort_by_file_name(&mut inputs);
    Ok(inputs)
}

pub fn sort_by_file_name(paths: &mut [PathBuf]) {
    paths.sort_by(|left, right| {
        left.file_name()
            .cmp(&right.file_name())
            .then_with(|| left.cmp(right))
    });
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("invalid file pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: globset::Error,
    },
    #[error("failed to read input directory '{}': {source}", path.display())]
    ReadDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<DiscoveryError> for CorrectionError {
    fn from(error: DiscoveryError) -> Self {
        let message = error.to_string();
        match error {
            DiscoveryError::InvalidGlob { .. } => {
                CorrectionError::input_validation("INPUT.FILE_PATTERN", message)
            }
            DiscoveryError::ReadDirectory { .. } => {
                CorrectionError::io_system("IO.INPUT_DIRECTORY", message)
            }
        }
    }
}
