use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CorrectionResult<T> = Result<T, CorrectionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorrectionErrorCategory {
    Success,
    InputValidationError,
    ParseError,
    DataIntegrityError,
    IoSystemError,
    InternalError,
}

impl CorrectionErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InputValidationError => 2,
            Self::ParseError => 3,
            Self::DataIntegrityError => 4,
            Self::IoSystemError => 5,
            Self::InternalError => 6,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::InputValidationError => "InputValidationError",
            Self::ParseError => "ParseError",
            Self::DataIntegrityError => "DataIntegrityError",
            Self::IoSystemError => "IoSystemError",
            Self::InternalError => "InternalError",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

/// Error carried through the correction workflow.
///
/// `code` is a stable dotted identifier (`DATA.GRID_MISMATCH`, `IO.OUTPUT_WRITE`)
/// that reports and tests can match on without parsing the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionError {
    category: CorrectionErrorCategory,
    code: &'static str,
    message: String,
}

impl CorrectionError {
    pub fn new(
        category: CorrectionErrorCategory,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
        }
    }

    pub fn input_validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(CorrectionErrorCategory::InputValidationError, code, message)
    }

    pub fn parse(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(CorrectionErrorCategory::ParseError, code, message)
    }

    pub fn data_integrity(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(CorrectionErrorCategory::DataIntegrityError, code, message)
    }

    pub fn io_system(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(CorrectionErrorCategory::IoSystemError, code, message)
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(CorrectionErrorCategory::InternalError, code, message)
    }

    pub const fn category(&self) -> CorrectionErrorCategory {
        self.category
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.code, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for CorrectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.code,
            self.message
        )
    }
}

impl Error for CorrectionError {}
