use super::CliError;
use anyhow::Context;
use bcbias_core::common::config::{
    CorrectionConfig, DatasetFormat, load_config_file_with_workdir,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(clap::Args, Default)]
pub(super) struct LoggingFlags {
    /// Log per-file state transitions (debug level)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

/// Installs the global subscriber on stderr. `RUST_LOG` wins over the
/// default directive; a second call is a no-op.
pub(super) fn init_tracing(flags: &LoggingFlags) {
    let default_directive = if flags.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);
    let _ = if flags.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[derive(clap::Args, Default)]
pub(super) struct LocationArgs {
    /// Settings file (JSON, or YAML for .yml/.yaml) naming `workdir` and `gccache`
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Working directory (default: current directory)
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Directory holding the boundary-condition files
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Bias dataset (default: <workdir>/step3/Bias_4x5_dk_2_updated.nc)
    #[arg(long)]
    bias_file: Option<PathBuf>,

    /// Output directory (default: <workdir>/smoothed-boundary-conditions)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Dataset format: netcdf or json
    #[arg(long)]
    format: Option<String>,
}

/// Builds the run configuration from `--config` and the location flags. Flags
/// override values from the settings file; `--workdir` also moves the bias
/// dataset and output directory unless the file names them absolutely.
pub(super) fn resolve_config(
    args: &LocationArgs,
    require_input_dir: bool,
) -> Result<CorrectionConfig, CliError> {
    let mut config = match (&args.config, &args.workdir) {
        (Some(path), workdir) => {
            let workdir = match workdir {
                Some(workdir) => Some(
                    std::env::current_dir()
                        .context("failed to resolve current directory")?
                        .join(workdir),
                ),
                None => None,
            };
            load_config_file_with_workdir(path, workdir.as_deref())?
        }
        (None, workdir) => {
            let workdir = match workdir {
                Some(workdir) => workdir.clone(),
                None => std::env::current_dir().context("failed to resolve current directory")?,
            };
            let input_dir = match (&args.input_dir, require_input_dir) {
                (Some(input_dir), _) => input_dir.clone(),
                (None, false) => workdir.clone(),
                (None, true) => {
                    return Err(CliError::Usage(
                        "either --config or --input-dir is required".to_string(),
                    ));
                }
            };
            CorrectionConfig::new(workdir, input_dir)
        }
    };

    if let Some(input_dir) = &args.input_dir {
        config.input_dir = input_dir.clone();
    }
    if let Some(bias_file) = &args.bias_file {
        config.bias_path = bias_file.clone();
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(format) = &args.format {
        config.format = format
            .parse::<DatasetFormat>()
            .map_err(|error| CliError::Usage(error.to_string()))?;
    }
    Ok(config)
}
