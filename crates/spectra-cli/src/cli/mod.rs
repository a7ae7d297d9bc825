mod commands;
mod helpers;

use clap::Parser;
use spectra_core::domain::SpectraError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const PROGRAM_NAME: &str = "sightline-spectra";

pub fn run_from_env() -> i32 {
    init_tracing();
    let remaining: Vec<String> = std::env::args().skip(1).collect();

    match run(remaining) {
        Ok(code) => code,
        Err(error) => {
            let spectra_error = error.as_spectra_error();
            eprintln!("{}", spectra_error.diagnostic_line());
            spectra_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once(PROGRAM_NAME.to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

// Logs go to stderr so spectra piped through stdout stay clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.global, cli.command),
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
    name = "sightline-spectra",
    version,
    about = "Calibrate and post-process synthetic sightline spectra"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub(super) struct GlobalArgs {
    /// Generator configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory with line lists, templates, and LSF kernels
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// List the preset instruments
    Instruments,
    /// List lines in the line database, optionally filtered
    Lines(commands::LinesArgs),
    /// Write a unit-flux spectrum on an instrument's grid
    Flat(commands::FlatArgs),
    /// Apply foregrounds, line spread, and noise to a spectrum
    Process(commands::ProcessArgs),
}

fn dispatch_parsed(global: GlobalArgs, command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Instruments => commands::run_instruments_command(),
        CliCommand::Lines(args) => commands::run_lines_command(&global, args),
        CliCommand::Flat(args) => commands::run_flat_command(&global, args),
        CliCommand::Process(args) => commands::run_process_command(&global, args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(SpectraError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<SpectraError> for CliError {
    fn from(error: SpectraError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_spectra_error(&self) -> SpectraError {
        match self {
            Self::Usage(message) => {
                SpectraError::configuration("CONFIG.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => SpectraError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
