//! The spectrum generator: one active instrument, one line catalog, one spectrum.
//!
//! Every post-processing step mutates the generator's spectrum in place. The
//! steps do not commute; callers pick the order (the CLI applies QSO, Milky
//! Way, LSF, then noise).

use crate::config::{
    DataPaths, GeneratorConfig, LINE_LISTS_SUBDIR, MILKY_WAY_TEMPLATE_FILE, QSO_TEMPLATE_FILE,
    SPECTRAL_TEMPLATES_SUBDIR,
};
use crate::domain::{SpectraError, SpectraErrorCategory, SpectraResult, Spectrum};
use crate::instrument::{
    DEFAULT_INSTRUMENT_NAME, InstrumentProfile, InstrumentRegistry, InstrumentSelector,
};
use crate::io::{self, SpectrumFormat};
use crate::lines::{IonFieldTable, LineDatabase};
use crate::lsf::{KernelSource, LsfKernel, apply_lsf};
use crate::numerics::{GaussianNoiseInput, add_gaussian_noise};
use crate::synthesis::{
    DepositionEngine, IonBalance, Parallelism, SightlineDataset, SightlineLoader,
    SynthesisOrchestrator, SynthesisRequest, default_worker_count,
};
use crate::templates::{ReferenceTemplate, apply_milky_way, apply_qso};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisOptions {
    pub use_peculiar_velocity: bool,
    pub parallelism: Parallelism,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            use_peculiar_velocity: true,
            parallelism: Parallelism::Auto,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpectrumGenerator<'r> {
    registry: &'r InstrumentRegistry,
    instrument: InstrumentProfile,
    line_database: LineDatabase,
    paths: DataPaths,
    ionization_table: Option<PathBuf>,
    field_table: IonFieldTable,
    workers: usize,
    spectrum: Spectrum,
}

impl<'r> SpectrumGenerator<'r> {
    /// Creates a generator with a flat spectrum on the instrument's grid.
    /// Without an instrument the COS preset is used.
    pub fn new(
        registry: &'r InstrumentRegistry,
        instrument: Option<InstrumentSelector>,
        line_database: LineDatabase,
        paths: DataPaths,
    ) -> SpectraResult<Self> {
        let selector = instrument.unwrap_or_else(|| {
            tracing::info!(
                "No instrument specified, defaulting to {}",
                DEFAULT_INSTRUMENT_NAME
            );
            InstrumentSelector::preset(DEFAULT_INSTRUMENT_NAME)
        });
        let instrument = registry.resolve(&selector)?;
        tracing::info!("Setting instrument to {}", instrument.name());

        let spectrum = Spectrum::flat(instrument.grid().clone());
        Ok(Self {
            registry,
            instrument,
            line_database,
            paths,
            ionization_table: None,
            field_table: IonFieldTable::standard(),
            workers: default_worker_count(),
            spectrum,
        })
    }

    /// Builds a generator over the preset registry from a configuration file's
    /// settings. The line catalog is looked up under `line_lists/` first.
    pub fn from_config(config: &GeneratorConfig) -> SpectraResult<SpectrumGenerator<'static>> {
        let paths = config.data_paths();
        let catalog = paths.resolve_required(
            LINE_LISTS_SUBDIR,
            config.line_database_name(),
            "CONFIG.LINE_DATABASE",
            "line database",
        )?;
        let line_database = LineDatabase::load(&catalog)?;

        let instrument = config.instrument.as_deref().map(InstrumentSelector::preset);
        let mut generator =
            SpectrumGenerator::new(InstrumentRegistry::presets(), instrument, line_database, paths)?;
        generator.ionization_table = config.ionization_table.clone();
        if let Some(workers) = config.workers {
            generator.workers = workers.max(1);
        }
        Ok(generator)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_ionization_table(mut self, table: impl Into<PathBuf>) -> Self {
        self.ionization_table = Some(table.into());
        self
    }

    pub fn with_field_table(mut self, field_table: IonFieldTable) -> Self {
        self.field_table = field_table;
        self
    }

    pub fn instrument(&self) -> &InstrumentProfile {
        &self.instrument
    }

    pub fn line_database(&self) -> &LineDatabase {
        &self.line_database
    }

    pub fn data_paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    pub fn into_spectrum(self) -> Spectrum {
        self.spectrum
    }

    /// Switches instruments and resets the spectrum to flat on the new grid.
    pub fn set_instrument(&mut self, selector: &InstrumentSelector) -> SpectraResult<()> {
        let instrument = self.registry.resolve(selector)?;
        tracing::info!("Setting instrument to {}", instrument.name());
        self.spectrum = Spectrum::flat(instrument.grid().clone());
        self.instrument = instrument;
        Ok(())
    }

    pub fn make_flat_spectrum(&mut self) -> &Spectrum {
        self.spectrum = Spectrum::flat(self.instrument.grid().clone());
        &self.spectrum
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_line_to_database(
        &mut self,
        element: &str,
        ion_state: &str,
        wavelength: f64,
        gamma: f64,
        f_value: f64,
        field: Option<&str>,
        identifier: Option<&str>,
    ) -> SpectraResult<()> {
        self.line_database
            .add_line(element, ion_state, wavelength, gamma, f_value, field, identifier)?;
        Ok(())
    }

    /// Replaces the spectrum with absorption from the requested lines.
    ///
    /// Missing ion fields are derived through `ion_balance`; the ionization
    /// table is resolved only when at least one field is missing.
    pub fn make_spectrum<S: AsRef<str>>(
        &mut self,
        dataset: &mut dyn SightlineDataset,
        lines: Option<&[S]>,
        engine: &dyn DepositionEngine,
        ion_balance: &dyn IonBalance,
        options: SynthesisOptions,
    ) -> SpectraResult<&Spectrum> {
        let active = self.line_database.select(lines)?;
        let orchestrator = SynthesisOrchestrator::new(engine, ion_balance)
            .with_field_table(self.field_table.clone());

        let missing = orchestrator.missing_fields(&*dataset, &active);
        for line in &missing {
            orchestrator.field_table().resolve(line)?;
        }
        let table = if missing.is_empty() {
            None
        } else {
            Some(
                self.paths
                    .resolve_ionization_table(self.ionization_table.as_deref())?,
            )
        };

        let grid = self.instrument.grid();
        let mut request = SynthesisRequest::new(&active, grid, self.workers)
            .with_parallelism(options.parallelism)
            .with_peculiar_velocity(options.use_peculiar_velocity);
        if let Some(table) = table.as_deref() {
            request = request.with_ionization_table(table);
        }

        let flux = orchestrator.synthesize(dataset, request)?;
        self.spectrum = Spectrum::new(grid.clone(), flux)?;
        Ok(&self.spectrum)
    }

    /// Loads the sightline at `path` and synthesizes from it.
    pub fn make_spectrum_from_path<S: AsRef<str>>(
        &mut self,
        loader: &dyn SightlineLoader,
        path: &Path,
        lines: Option<&[S]>,
        engine: &dyn DepositionEngine,
        ion_balance: &dyn IonBalance,
        options: SynthesisOptions,
    ) -> SpectraResult<&Spectrum> {
        let mut dataset = loader.load(path).map_err(|error| {
            if error.category() == SpectraErrorCategory::Dataset {
                error
            } else {
                SpectraError::dataset(
                    "DATA.SIGHTLINE_LOAD",
                    format!(
                        "failed to load sightline '{}': {}",
                        path.display(),
                        error.message()
                    ),
                )
            }
        })?;
        self.make_spectrum(dataset.as_mut(), lines, engine, ion_balance, options)
    }

    /// Multiplies in the QSO composite shifted to `redshift`.
    pub fn add_qso_spectrum(&mut self, redshift: f64, template: Option<&Path>) -> SpectraResult<()> {
        let path = self.template_path(template, QSO_TEMPLATE_FILE, "QSO template")?;
        let template = ReferenceTemplate::load(&path)?;
        apply_qso(&mut self.spectrum, &template, redshift)
    }

    pub fn add_milky_way_foreground(&mut self, template: Option<&Path>) -> SpectraResult<()> {
        let path = self.template_path(template, MILKY_WAY_TEMPLATE_FILE, "Milky Way template")?;
        let template = ReferenceTemplate::load(&path)?;
        apply_milky_way(&mut self.spectrum, &template)
    }

    /// Convolves the spectrum with `source`, or with the instrument's default LSF.
    pub fn apply_lsf(&mut self, source: Option<&KernelSource>) -> SpectraResult<()> {
        let kernel = LsfKernel::resolve(
            source.unwrap_or(&KernelSource::InstrumentDefault),
            &self.instrument,
            &self.paths,
        )?;
        apply_lsf(&mut self.spectrum, &kernel)
    }

    pub fn add_gaussian_noise(&mut self, input: GaussianNoiseInput) -> SpectraResult<()> {
        add_gaussian_noise(self.spectrum.flux_mut(), input)?;
        Ok(())
    }

    pub fn save_spectrum(&self, path: &Path, format: Option<&str>) -> SpectraResult<SpectrumFormat> {
        io::save_with_format(&self.spectrum, path, format)
    }

    /// Replaces the spectrum, grid included, with one read from `path`.
    pub fn load_spectrum(&mut self, path: &Path) -> SpectraResult<&Spectrum> {
        self.spectrum = io::load(path)?;
        Ok(&self.spectrum)
    }

    fn template_path(
        &self,
        explicit: Option<&Path>,
        default_name: &str,
        what: &str,
    ) -> SpectraResult<PathBuf> {
        self.paths.resolve_required(
            SPECTRAL_TEMPLATES_SUBDIR,
            explicit.unwrap_or(Path::new(default_name)),
            "CONFIG.TEMPLATE_MISSING",
            what,
        )
    }
}
