use super::helpers::{InstrumentArgs, load_config, post_processing_generator};
use super::{CliError, GlobalArgs};
use anyhow::Context;
use spectra_core::config::LINE_LISTS_SUBDIR;
use spectra_core::instrument::{DEFAULT_INSTRUMENT_NAME, InstrumentRegistry};
use spectra_core::io::format_scientific;
use spectra_core::lines::LineDatabase;
use spectra_core::lsf::KernelSource;
use spectra_core::numerics::GaussianNoiseInput;
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct LinesArgs {
    /// Line catalog; looked up under the data directory's line_lists/ first
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Line specifiers such as "H", "Mg II", or "Mg II 2796"; all lines when omitted
    #[arg(value_name = "SPECIFIER")]
    specifiers: Vec<String>,

    /// Print the selected lines as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
pub(super) struct FlatArgs {
    /// Output path; the extension picks the format unless --format is given
    #[arg(long)]
    output: PathBuf,

    /// Output format: HDF5, FITS, or ASCII
    #[arg(long)]
    format: Option<String>,

    #[command(flatten)]
    instrument: InstrumentArgs,
}

#[derive(clap::Args)]
pub(super) struct ProcessArgs {
    /// Spectrum to start from (binary table); a flat spectrum when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output path; the extension picks the format unless --format is given
    #[arg(long)]
    output: PathBuf,

    /// Output format: HDF5, FITS, or ASCII
    #[arg(long)]
    format: Option<String>,

    #[command(flatten)]
    instrument: InstrumentArgs,

    /// Multiply in the QSO continuum shifted to this redshift
    #[arg(long)]
    qso_redshift: Option<f64>,

    /// QSO template replacing the bundled one
    #[arg(long, requires = "qso_redshift")]
    qso_template: Option<PathBuf>,

    /// Multiply in the Milky Way foreground
    #[arg(long)]
    milky_way: bool,

    /// Milky Way template replacing the bundled one
    #[arg(long, requires = "milky_way")]
    mw_template: Option<PathBuf>,

    /// Convolve with the instrument's default line spread function
    #[arg(long, conflicts_with_all = ["lsf_file", "lsf_function"])]
    instrument_lsf: bool,

    /// Convolve with the kernel in this file
    #[arg(long, conflicts_with = "lsf_function")]
    lsf_file: Option<PathBuf>,

    /// Convolve with a generated kernel: boxcar or gaussian
    #[arg(long)]
    lsf_function: Option<String>,

    /// Width of the generated kernel, in bins
    #[arg(long, requires = "lsf_function")]
    lsf_width: Option<f64>,

    /// Add Gaussian noise at this signal-to-noise ratio
    #[arg(long)]
    snr: Option<f64>,

    /// Seed for reproducible noise
    #[arg(long, requires = "snr")]
    seed: Option<u64>,
}

impl ProcessArgs {
    fn kernel_source(&self) -> Option<KernelSource> {
        if self.instrument_lsf {
            Some(KernelSource::InstrumentDefault)
        } else if let Some(path) = &self.lsf_file {
            Some(KernelSource::File(path.clone()))
        } else {
            self.lsf_function
                .as_ref()
                .map(|name| KernelSource::Function {
                    name: name.clone(),
                    width: self.lsf_width,
                })
        }
    }

    fn noise(&self) -> Option<GaussianNoiseInput> {
        self.snr.map(|snr| {
            let input = GaussianNoiseInput::new(snr);
            match self.seed {
                Some(seed) => input.with_seed(seed),
                None => input,
            }
        })
    }
}

pub(super) fn run_instruments_command() -> Result<i32, CliError> {
    for profile in InstrumentRegistry::presets().profiles() {
        let marker = if profile.name() == DEFAULT_INSTRUMENT_NAME {
            " (default)"
        } else {
            ""
        };
        println!("{}{}", profile, marker);
    }
    Ok(0)
}

pub(super) fn run_lines_command(global: &GlobalArgs, args: LinesArgs) -> Result<i32, CliError> {
    let config = load_config(global)?;
    let name = args
        .catalog
        .as_deref()
        .unwrap_or_else(|| config.line_database_name());
    let path = config.data_paths().resolve_required(
        LINE_LISTS_SUBDIR,
        name,
        "CONFIG.LINE_DATABASE",
        "line database",
    )?;
    let database = LineDatabase::load(&path)?;
    let selected = database.select(Some(args.specifiers.as_slice()))?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&selected)
            .context("failed to render selected lines as JSON")?;
        println!("{}", rendered);
        return Ok(0);
    }

    println!(
        "{:<20} {:>12} {:>14} {:>14}  field",
        "identifier", "wavelength", "f_value", "gamma"
    );
    for line in &selected {
        println!(
            "{:<20} {:>12.3} {:>14} {:>14}  {}",
            line.identifier,
            line.wavelength,
            format_scientific(line.f_value),
            format_scientific(line.gamma),
            line.field
        );
    }
    Ok(0)
}

pub(super) fn run_flat_command(global: &GlobalArgs, args: FlatArgs) -> Result<i32, CliError> {
    let config = load_config(global)?;
    let mut generator = post_processing_generator(&config, args.instrument.selector(&config))?;
    generator.make_flat_spectrum();

    let format = generator.save_spectrum(&args.output, args.format.as_deref())?;
    info!("flat: saved {} output", format);
    println!(
        "Wrote flat {} spectrum ({} bins) to {}",
        format,
        generator.spectrum().len(),
        args.output.display()
    );
    Ok(0)
}

/// Steps run in a fixed order: QSO, Milky Way, LSF, noise.
pub(super) fn run_process_command(global: &GlobalArgs, args: ProcessArgs) -> Result<i32, CliError> {
    let config = load_config(global)?;
    let mut generator = post_processing_generator(&config, args.instrument.selector(&config))?;

    if let Some(input) = &args.input {
        generator.load_spectrum(input)?;
        info!("process: loaded {} bins from {}", generator.spectrum().len(), input.display());
    }
    if let Some(redshift) = args.qso_redshift {
        generator.add_qso_spectrum(redshift, args.qso_template.as_deref())?;
        info!("process: applied QSO continuum at z={}", redshift);
    }
    if args.milky_way {
        generator.add_milky_way_foreground(args.mw_template.as_deref())?;
        info!("process: applied Milky Way foreground");
    }
    if let Some(source) = args.kernel_source() {
        generator.apply_lsf(Some(&source))?;
        info!("process: convolved with {:?}", source);
    }
    if let Some(noise) = args.noise() {
        generator.add_gaussian_noise(noise)?;
        info!("process: added noise at snr={}", noise.snr);
    }

    let format = generator.save_spectrum(&args.output, args.format.as_deref())?;
    info!("process: saved {} output", format);
    println!(
        "Wrote {} spectrum ({} bins) to {}",
        format,
        generator.spectrum().len(),
        args.output.display()
    );
    Ok(0)
}
