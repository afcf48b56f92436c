use crate::domain::{CorrectionError, CorrectionResult, ExecutionMode, FileOutcome, FileState};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize)]
pub struct CorrectionReport {
    pub generated_at_unix_seconds: u64,
    pub passed: bool,
    pub execution_mode: ExecutionMode,
    pub output_dir: String,
    pub file_count: usize,
    pub written_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub outcomes: Vec<FileOutcome>,
}

impl CorrectionReport {
    /// `outcomes` are expected in file-name order.
    pub fn from_outcomes(
        execution_mode: ExecutionMode,
        output_dir: &Path,
        outcomes: Vec<FileOutcome>,
    ) -> Self {
        let count = |state: FileState| {
            outcomes
                .iter()
                .filter(|outcome| outcome.state == state)
                .count()
        };
        let written_count = count(FileState::Written);
        let skipped_count = count(FileState::Skipped);
        let failed_count = count(FileState::Failed);

        Self {
            generated_at_unix_seconds: current_unix_timestamp_seconds(),
            passed: failed_count == 0,
            execution_mode,
            output_dir: normalize_path(output_dir),
            file_count: outcomes.len(),
            written_count,
            skipped_count,
            failed_count,
            outcomes,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.state == FileState::Failed)
    }

    pub fn outcome_for(&self, file_name: &str) -> Option<&FileOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.file_name == file_name)
    }
}

pub fn render_human_summary(report: &CorrectionReport) -> String {
    let mut lines = Vec::new();
    let status = if report.passed { "PASS" } else { "FAIL" };
    lines.push(format!("Correction status: {}", status));
    lines.push(format!(
        "Files: {} total ({} written, {} skipped, {} failed)",
        report.file_count, report.written_count, report.skipped_count, report.failed_count
    ));
    lines.push(format!("Output directory: {}", report.output_dir));

    for outcome in &report.outcomes {
        let key = outcome
            .date_key
            .map(|key| key.to_string())
            .unwrap_or_else(|| "-".to_string());
        match outcome.state {
            FileState::Failed => {
                let reason = outcome
                    .error
                    .as_ref()
                    .map(CorrectionError::diagnostic_line)
                    .unwrap_or_else(|| "failed without a recorded error".to_string());
                lines.push(format!("  {} [{}] FAILED: {}", outcome.file_name, key, reason));
            }
            FileState::Skipped => lines.push(format!(
                "  {} [{}] skipped (no bias entry)",
                outcome.file_name, key
            )),
            state => lines.push(format!("  {} [{}] {}", outcome.file_name, key, state)),
        }
    }

    lines.join("\n")
}

pub fn write_report_file(report_path: &Path, report: &CorrectionReport) -> CorrectionResult<()> {
    if let Some(parent_dir) = report_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent_dir).map_err(|source| ReportError::Directory {
            path: parent_dir.to_path_buf(),
            source,
        })?;
    }

    let report_json =
        serde_json::to_string_pretty(report).map_err(|source| ReportError::Serialize {
            path: report_path.to_path_buf(),
            source,
        })?;
    fs::write(report_path, report_json).map_err(|source| ReportError::Write {
        path: report_path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to create report directory '{}': {source}", path.display())]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize report '{}': {source}", path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write report '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<ReportError> for CorrectionError {
    fn from(error: ReportError) -> Self {
        let message = error.to_string();
        match error {
            ReportError::Directory { .. } | ReportError::Write { .. } => {
                CorrectionError::io_system("IO.REPORT", message)
            }
            ReportError::Serialize { .. } => CorrectionError::internal("SYS.REPORT", message),
        }
    }
}

fn current_unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
