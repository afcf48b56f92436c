use super::CliError;
use super::helpers::{LocationArgs, resolve_config};
use bcbias_core::domain::{CorrectionErrorCategory, ExecutionMode};
use bcbias_core::modules::{
    CorrectionPipeline, DateKeyExtractor, render_human_summary, write_report_file,
};
use bcbias_core::storage::store_for_format;
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct RunArgs {
    #[command(flatten)]
    location: LocationArgs,

    /// File-name glob selecting boundary-condition files
    #[arg(long)]
    pattern: Option<String>,

    /// Species variable to correct
    #[arg(long)]
    species: Option<String>,

    /// Process files on the rayon thread pool
    #[arg(long)]
    parallel: bool,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct BiasKeysArgs {
    #[command(flatten)]
    location: LocationArgs,
}

pub(super) fn run_correction_command(args: RunArgs) -> Result<i32, CliError> {
    let mut config = resolve_config(&args.location, true)?;
    if let Some(pattern) = args.pattern {
        config.file_pattern = pattern;
    }
    if let Some(species) = args.species {
        config.species_variable = species;
    }
    if args.parallel {
        config.execution_mode = ExecutionMode::Parallel;
    }
    config.validate()?;

    info!(
        workdir = %config.workdir.display(),
        input_dir = %config.input_dir.display(),
        bias = %config.bias_path.display(),
        format = %config.format,
        "resolved configuration"
    );

    let store = store_for_format(config.format)?;
    let pipeline = CorrectionPipeline::new(config, store.as_ref());
    let report = pipeline.run_configured()?;

    println!("{}", render_human_summary(&report));
    if let Some(report_path) = args.report {
        write_report_file(&report_path, &report)?;
        println!("JSON report: {}", report_path.display());
    }

    if report.passed { Ok(0) } else { Ok(1) }
}

pub(super) fn run_bias_keys_command(args: BiasKeysArgs) -> Result<i32, CliError> {
    let config = resolve_config(&args.location, false)?;
    config.validate()?;
    let store = store_for_format(config.format)?;
    let pipeline = CorrectionPipeline::new(config, store.as_ref());
    let table = pipeline.load_bias_table()?;

    let (lat, lon) = table.grid_shape();
    println!("Bias dataset: {}", pipeline.config().bias_path.display());
    println!("Grid: {}x{}", lat, lon);
    println!("Date keys ({}):", table.len());
    for key in table.date_keys() {
        println!("  {}", key);
    }
    let duplicates = table.duplicate_keys();
    if !duplicates.is_empty() {
        let listed = duplicates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("Duplicate keys (first entry wins): {}", listed);
    }
    Ok(0)
}

pub(super) fn run_date_key_command(names: &[String]) -> Result<i32, CliError> {
    let extractor = DateKeyExtractor::default();
    let mut exit_code = 0;
    for name in names {
        match extractor.extract(name) {
            Ok(key) => println!("{}\t{}", name, key),
            Err(error) => {
                eprintln!("{}", error.diagnostic_line());
                exit_code = CorrectionErrorCategory::ParseError.exit_code();
            }
        }
    }
    Ok(exit_code)
}
