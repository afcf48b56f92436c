mod commands;
mod helpers;

use bcbias_core::domain::CorrectionError;
use clap::Parser;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let correction_error = error.as_correction_error();
            eprintln!("{}", correction_error.diagnostic_line());
            if let Some(summary_line) = correction_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            correction_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("bcbias".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_tracing(&cli.logging);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "bcbias",
    version,
    about = "Bias correction of GEOS-Chem boundary-condition files"
)]
struct Cli {
    #[command(flatten)]
    logging: helpers::LoggingFlags,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Correct every matching boundary-condition file
    Run(commands::RunArgs),
    /// Print the date keys and grid shape of the bias dataset
    BiasKeys(commands::BiasKeysArgs),
    /// Print the date key extracted from each file name
    DateKey {
        /// Boundary-condition file names
        #[arg(value_name = "FILE_NAME", required = true)]
        names: Vec<String>,
    },
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_correction_command(args),
        CliCommand::BiasKeys(args) => commands::run_bias_keys_command(args),
        CliCommand::DateKey { names } => commands::run_date_key_command(&names),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(CorrectionError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_correction_error(&self) -> CorrectionError {
        match self {
            Self::Usage(message) => {
                CorrectionError::input_validation("INPUT.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => CorrectionError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}

impl From<CorrectionError> for CliError {
    fn from(error: CorrectionError) -> Self {
        Self::Compute(error)
    }
}
