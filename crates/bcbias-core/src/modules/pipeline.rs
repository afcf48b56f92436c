use super::bias_table::BiasTable;
use super::corrector::LevelBroadcastCorrector;
use super::date_key::DateKeyExtractor;
use super::report::CorrectionReport;
use super::traits::DatasetStore;
use crate::common::config::CorrectionConfig;
use crate::common::discovery::{discover_inputs, sort_by_file_name};
use crate::domain::{
    CorrectionError, CorrectionResult, ExecutionMode, FileOutcome, FileState, file_name_of,
};
use ndarray::ArrayView2;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Applies a [`BiasTable`] to a set of boundary-condition files.
///
/// The pipeline owns no mutable state; the same instance may run any number
/// of times, serially or on the rayon pool.
pub struct CorrectionPipeline<'a> {
    config: CorrectionConfig,
    store: &'a dyn DatasetStore,
    extractor: DateKeyExtractor,
    corrector: LevelBroadcastCorrector,
}

impl<'a> CorrectionPipeline<'a> {
    pub fn new(config: CorrectionConfig, store: &'a dyn DatasetStore) -> Self {
        let corrector = LevelBroadcastCorrector::new(config.level_count);
        Self {
            config,
            store,
            extractor: DateKeyExtractor::default(),
            corrector,
        }
    }

    pub fn with_extractor(mut self, extractor: DateKeyExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.config.execution_mode = mode;
        self
    }

    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    pub fn load_bias_table(&self) -> CorrectionResult<BiasTable> {
        BiasTable::load(
            self.store,
            &self.config.bias_path,
            &self.config.bias_variable,
            &self.config.date_variable,
            self.config.scale_factor,
        )
    }

    pub fn discover_inputs(&self) -> CorrectionResult<Vec<PathBuf>> {
        discover_inputs(&self.config.input_dir, &self.config.file_pattern)
    }

    /// Validates the configuration, loads the bias table, discovers inputs and
    /// corrects them into the configured output directory.
    pub fn run_configured(&self) -> CorrectionResult<CorrectionReport> {
        self.config.validate()?;
        let table = self.load_bias_table()?;
        let inputs = self.discover_inputs()?;
        self.run(&table, &inputs, &self.config.output_dir)
    }

    /// Processes `inputs` in file-name order and returns one outcome per
    /// distinct path. Only a failure to create `output_dir` is returned as an
    /// error; every per-file failure is recorded in the report.
    pub fn run(
        &self,
        table: &BiasTable,
        inputs: &[PathBuf],
        output_dir: &Path,
    ) -> CorrectionResult<CorrectionReport> {
        fs::create_dir_all(output_dir).map_err(|source| {
            CorrectionError::io_system(
                "IO.OUTPUT_DIRECTORY",
                format!(
                    "failed to create output directory '{}': {}",
                    output_dir.display(),
                    source
                ),
            )
        })?;

        let mut ordered = inputs.to_vec();
        sort_by_file_name(&mut ordered);
        ordered.dedup();

        let mode = self.config.execution_mode;
        info!(
            files = ordered.len(),
            mode = %mode,
            output_dir = %output_dir.display(),
            "starting correction run"
        );

        let mut claimed = BTreeSet::new();
        let mut work = Vec::with_capacity(ordered.len());
        let mut outcomes = Vec::new();
        for input in &ordered {
            if claimed.insert(file_name_of(input)) {
                work.push(input.as_path());
            } else {
                outcomes.push(self.duplicate_output(input));
            }
        }

        let processed = match mode {
            ExecutionMode::Serial => work
                .iter()
                .map(|input| self.process_file(table, input, output_dir))
                .collect::<Vec<_>>(),
            ExecutionMode::Parallel => work
                .par_iter()
                .map(|input| self.process_file(table, input, output_dir))
                .collect::<Vec<_>>(),
        };
        outcomes.extend(processed);
        outcomes.sort_by(|left, right| {
            left.file_name
                .cmp(&right.file_name)
                .then_with(|| left.input_path.cmp(&right.input_path))
        });

        let report = CorrectionReport::from_outcomes(mode, output_dir, outcomes);
        info!(
            written = report.written_count,
            skipped = report.skipped_count,
            failed = report.failed_count,
            "correction run finished"
        );
        Ok(report)
    }

    /// Runs one file to a terminal state. Never panics on bad input and never
    /// leaves a partial output behind.
    pub fn process_file(&self, table: &BiasTable, input: &Path, output_dir: &Path) -> FileOutcome {
        let file_name = file_name_of(input);
        let mut state = FileState::Pending;

        let date_key = match self.extractor.extract(&file_name) {
            Ok(key) => key,
            Err(err) => {
                advance(&file_name, &mut state, FileState::Failed);
                error!(file = %file_name, error = %err, "could not extract date key");
                return FileOutcome::failed(input, None, err);
            }
        };
        advance(&file_name, &mut state, FileState::KeyExtracted);

        let Some(correction) = table.lookup(date_key) else {
            advance(&file_name, &mut state, FileState::Unmatched);
            advance(&file_name, &mut state, FileState::Skipped);
            warn!(
                file = %file_name,
                date_key = %date_key,
                "no bias entry for date key; skipping file"
            );
            return FileOutcome::skipped(input, date_key);
        };
        advance(&file_name, &mut state, FileState::Matched);

        match self.correct_and_write(input, &file_name, correction, output_dir, &mut state) {
            Ok(output_path) => {
                advance(&file_name, &mut state, FileState::Written);
                info!(
                    file = %file_name,
                    date_key = %date_key,
                    output = %output_path.display(),
                    "wrote corrected file"
                );
                FileOutcome::written(input, date_key, output_path)
            }
            Err(err) => {
                advance(&file_name, &mut state, FileState::Failed);
                error!(
                    file = %file_name,
                    date_key = %date_key,
                    code = err.code(),
                    error = %err,
                    "file failed"
                );
                FileOutcome::failed(input, Some(date_key), err)
            }
        }
    }

    fn correct_and_write(
        &self,
        input: &Path,
        file_name: &str,
        correction: ArrayView2<'_, f64>,
        output_dir: &Path,
        state: &mut FileState,
    ) -> CorrectionResult<PathBuf> {
        let output_path = output_dir.join(file_name);
        if same_file(input, &output_path) {
            return Err(CorrectionError::input_validation(
                "INPUT.OUTPUT_OVERWRITES_INPUT",
                format!(
                    "output '{}' would overwrite its own input",
                    output_path.display()
                ),
            ));
        }

        let mut field = self
            .store
            .read_species(input, &self.config.species_variable)?;
        self.corrector.apply(&mut field, correction)?;
        advance(file_name, state, FileState::Corrected);

        // Dropping `staging` on any early return removes the temporary file.
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{file_name}."))
            .suffix(".partial")
            .tempfile_in(output_dir)
            .map_err(|source| output_error(&output_path, "create staging file", source))?;
        self.store.write_corrected(
            input,
            staging.path(),
            &self.config.species_variable,
            &field,
        )?;

        let permissions = fs::metadata(input)
            .map_err(|source| output_error(&output_path, "read input permissions", source))?
            .permissions();
        fs::set_permissions(staging.path(), permissions)
            .map_err(|source| output_error(&output_path, "set permissions", source))?;
        staging
            .persist(&output_path)
            .map_err(|persist| output_error(&output_path, "finalize", persist.error))?;

        Ok(output_path)
    }

    fn duplicate_output(&self, input: &Path) -> FileOutcome {
        let err = CorrectionError::input_validation(
            "INPUT.DUPLICATE_OUTPUT",
            format!(
                "another input with base name '{}' is already being corrected",
                file_name_of(input)
            ),
        );
        error!(file = %input.display(), error = %err, "file failed");
        let date_key = self.extractor.extract_from_path(input).ok();
        FileOutcome::failed(input, date_key, err)
    }
}

fn advance(file_name: &str, state: &mut FileState, next: FileState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal transition {state} -> {next}"
    );
    debug!(file = %file_name, from = %state, to = %next, "state transition");
    *state = next;
}

fn same_file(input: &Path, output: &Path) -> bool {
    match (fs::canonicalize(input), canonical_location(output)) {
        (Ok(input), Some(output)) => input == output,
        _ => input == output,
    }
}

/// Canonical form of a path whose final component may not exist yet.
fn canonical_location(path: &Path) -> Option<PathBuf> {
    if let Ok(path) = fs::canonicalize(path) {
        return Some(path);
    }
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    Some(fs::canonicalize(parent).ok()?.join(path.file_name()?))
}

fn output_error(path: &Path, action: &str, source: std::io::Error) -> CorrectionError {
    CorrectionError::io_system(
        "IO.OUTPUT_WRITE",
        format!("failed to {} for '{}': {}", action, path.display(), source),
    )
}
