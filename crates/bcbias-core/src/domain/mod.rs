pub mod errors;

pub use errors::{CorrectionError, CorrectionErrorCategory, CorrectionResult};

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Integer join key between a bias slice and a boundary-condition file,
/// conventionally a `YYYYMMDD` date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(i64);

impl DateKey {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for DateKey {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for DateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Serial,
    Parallel,
}

impl ExecutionMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Parallel => "parallel",
        }
    }
}

impl Display for ExecutionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Per-file processing state.
///
/// `Pending -> KeyExtracted -> Matched -> Corrected -> Written`, or
/// `KeyExtracted -> Unmatched -> Skipped`. Any step may end in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileState {
    Pending,
    KeyExtracted,
    Matched,
    Unmatched,
    Corrected,
    Written,
    Skipped,
    Failed,
}

impl FileState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::KeyExtracted => "KeyExtracted",
            Self::Matched => "Matched",
            Self::Unmatched => "Unmatched",
            Self::Corrected => "Corrected",
            Self::Written => "Written",
            Self::Skipped => "Skipped",
            Self::Failed => "Failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Written | Self::Skipped | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub const fn can_transition_to(self, next: FileState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::KeyExtracted)
                | (Self::KeyExtracted, Self::Matched)
                | (Self::KeyExtracted, Self::Unmatched)
                | (Self::Matched, Self::Corrected)
                | (Self::Corrected, Self::Written)
                | (Self::Unmatched, Self::Skipped)
                | (Self::Pending, Self::Failed)
                | (Self::KeyExtracted, Self::Failed)
                | (Self::Matched, Self::Failed)
                | (Self::Corrected, Self::Failed)
        )
    }
}

impl Display for FileState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Terminal result of processing one boundary-condition file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub file_name: String,
    pub input_path: PathBuf,
    pub date_key: Option<DateKey>,
    pub state: FileState,
    pub output_path: Option<PathBuf>,
    #[serde(serialize_with = "serialize_optional_error")]
    pub error: Option<CorrectionError>,
}

impl FileOutcome {
    pub fn written(input_path: &Path, date_key: DateKey, output_path: PathBuf) -> Self {
        Self {
            file_name: file_name_of(input_path),
            input_path: input_path.to_path_buf(),
            date_key: Some(date_key),
            state: FileState::Written,
            output_path: Some(output_path),
            error: None,
        }
    }

    pub fn skipped(input_path: &Path, date_key: DateKey) -> Self {
        Self {
            file_name: file_name_of(input_path),
            input_path: input_path.to_path_buf(),
            date_key: Some(date_key),
            state: FileState::Skipped,
            output_path: None,
            error: None,
        }
    }

    pub fn failed(input_path: &Path, date_key: Option<DateKey>, error: CorrectionError) -> Self {
        Self {
            file_name: file_name_of(input_path),
            input_path: input_path.to_path_buf(),
            date_key,
            state: FileState::Failed,
            output_path: None,
            error: Some(error),
        }
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn serialize_optional_error<S>(
    error: &Option<CorrectionError>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        None => serializer.serialize_none(),
        Some(error) => {
            let mut state = serializer.serialize_struct("CorrectionError", 3)?;
            state.serialize_field("category", error.category().as_str())?;
            state.serialize_field("code", error.code())?;
            state.serialize_field("message", error.message())?;
            state.end()
        }
    }
}
