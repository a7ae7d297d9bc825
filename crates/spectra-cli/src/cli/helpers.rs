use super::{CliError, GlobalArgs};
use spectra_core::SpectrumGenerator;
use spectra_core::config::GeneratorConfig;
use spectra_core::instrument::{CustomRange, InstrumentRegistry, InstrumentSelector};
use spectra_core::lines::LineDatabase;
use std::path::PathBuf;

/// Config file settings with command-line overrides applied.
pub(super) fn load_config(global: &GlobalArgs) -> Result<GeneratorConfig, CliError> {
    let mut config = match &global.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(data_dir) = &global.data_dir {
        config.data_dir = Some(data_dir.clone());
    }
    Ok(config)
}

#[derive(clap::Args, Debug, Clone, Default)]
pub(super) struct InstrumentArgs {
    /// Preset instrument (COS, HIRES, UVES, MODS, SDSS)
    #[arg(long, conflicts_with_all = ["lambda_min", "lambda_max"])]
    instrument: Option<String>,

    /// Lower wavelength bound of a custom instrument, in angstroms
    #[arg(long, requires = "lambda_max")]
    lambda_min: Option<f64>,

    /// Upper wavelength bound of a custom instrument, in angstroms
    #[arg(long, requires = "lambda_min")]
    lambda_max: Option<f64>,

    /// Number of bins for a custom instrument
    #[arg(long, requires = "lambda_min")]
    n_lambda: Option<usize>,

    /// Bin width for a custom instrument, in angstroms
    #[arg(long, requires = "lambda_min")]
    dlambda: Option<f64>,

    /// Default LSF kernel file for a custom instrument
    #[arg(long, requires = "lambda_min")]
    lsf_kernel: Option<PathBuf>,
}

impl InstrumentArgs {
    /// A custom range wins, then `--instrument`, then the config's instrument.
    pub(super) fn selector(&self, config: &GeneratorConfig) -> Option<InstrumentSelector> {
        if let (Some(lambda_min), Some(lambda_max)) = (self.lambda_min, self.lambda_max) {
            return Some(InstrumentSelector::Custom(CustomRange {
                lambda_min,
                lambda_max,
                n_lambda: self.n_lambda,
                dlambda: self.dlambda,
                lsf_kernel: self.lsf_kernel.clone(),
            }));
        }
        self.instrument
            .clone()
            .or_else(|| config.instrument.clone())
            .map(InstrumentSelector::Preset)
    }
}

/// Generator for post-processing commands, which never consult the line catalog.
pub(super) fn post_processing_generator(
    config: &GeneratorConfig,
    instrument: Option<InstrumentSelector>,
) -> Result<SpectrumGenerator<'static>, CliError> {
    let mut generator = SpectrumGenerator::new(
        InstrumentRegistry::presets(),
        instrument,
        LineDatabase::new(),
        config.data_paths(),
    )?;
    if let Some(workers) = config.workers {
        generator = generator.with_workers(workers);
    }
    if let Some(table) = &config.ionization_table {
        generator = generator.with_ionization_table(table.clone());
    }
    Ok(generator)
}
