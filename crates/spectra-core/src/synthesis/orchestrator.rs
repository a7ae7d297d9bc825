use super::engine::{
    DepositionEngine, DepositionRequest, IonBalance, RegisteredLine, SightlineDataset,
};
use super::partition::{Parallelism, plan_partition};
use crate::common::atomic_mass;
use crate::common::constants::LINE_LABEL_THRESHOLD;
use crate::domain::{SpectraError, SpectraResult, WavelengthGrid};
use crate::lines::{IonFieldTable, Transition};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub lines: &'a [Transition],
    pub grid: &'a WavelengthGrid,
    pub use_peculiar_velocity: bool,
    pub parallelism: Parallelism,
    pub workers: usize,
    /// Needed only when a line's field must be derived.
    pub ionization_table: Option<&'a Path>,
}

impl<'a> SynthesisRequest<'a> {
    pub fn new(lines: &'a [Transition], grid: &'a WavelengthGrid, workers: usize) -> Self {
        Self {
            lines,
            grid,
            use_peculiar_velocity: true,
            parallelism: Parallelism::Auto,
            workers,
            ionization_table: None,
        }
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_peculiar_velocity(mut self, use_peculiar_velocity: bool) -> Self {
        self.use_peculiar_velocity = use_peculiar_velocity;
        self
    }

    pub fn with_ionization_table(mut self, table: &'a Path) -> Self {
        self.ionization_table = Some(table);
        self
    }
}

/// Registers lines with a deposition engine and collects the resulting flux.
pub struct SynthesisOrchestrator<'a> {
    engine: &'a dyn DepositionEngine,
    ion_balance: &'a dyn IonBalance,
    fields: IonFieldTable,
}

impl<'a> SynthesisOrchestrator<'a> {
    pub fn new(engine: &'a dyn DepositionEngine, ion_balance: &'a dyn IonBalance) -> Self {
        Self {
            engine,
            ion_balance,
            fields: IonFieldTable::standard(),
        }
    }

    pub fn with_field_table(mut self, fields: IonFieldTable) -> Self {
        self.fields = fields;
        self
    }

    pub fn field_table(&self) -> &IonFieldTable {
        &self.fields
    }

    /// Lines whose fields the dataset lacks and which must be derived first.
    pub fn missing_fields<'l>(
        &self,
        dataset: &dyn SightlineDataset,
        lines: &'l [Transition],
    ) -> Vec<&'l Transition> {
        lines
            .iter()
            .filter(|line| !dataset.has_field(&line.field))
            .collect()
    }

    pub fn synthesize(
        &self,
        dataset: &mut dyn SightlineDataset,
        request: SynthesisRequest<'_>,
    ) -> SpectraResult<Vec<f64>> {
        if request.lines.is_empty() {
            return Err(SpectraError::selection(
                "SELECT.EMPTY",
                "no lines were selected for synthesis",
            ));
        }

        let mut registered = Vec::with_capacity(request.lines.len());
        for line in request.lines {
            if !dataset.has_field(&line.field) {
                self.derive_field(dataset, line, request.ionization_table)?;
            }
            registered.push(register_line(line)?);
        }

        let plan = plan_partition(request.parallelism, request.workers, registered.len());
        tracing::info!(
            lines = registered.len(),
            groups = plan.groups(),
            workers_per_group = plan.workers_per_group(),
            "depositing lines"
        );

        let flux = self.engine.deposit(
            &*dataset,
            &DepositionRequest {
                lines: &registered,
                grid: request.grid,
                use_peculiar_velocity: request.use_peculiar_velocity,
                plan: &plan,
            },
        )?;
        if flux.len() != request.grid.len() {
            return Err(SpectraError::dataset(
                "DATA.FLUX_SHAPE",
                format!(
                    "deposition returned {} flux values for a {}-bin grid",
                    flux.len(),
                    request.grid.len()
                ),
            ));
        }
        Ok(flux)
    }

    fn derive_field(
        &self,
        dataset: &mut dyn SightlineDataset,
        line: &Transition,
        ionization_table: Option<&Path>,
    ) -> SpectraResult<()> {
        let resolved = self.fields.resolve(line)?;
        let table = ionization_table.ok_or_else(|| {
            SpectraError::dataset(
                "DATA.ION_TABLE_MISSING",
                format!(
                    "field '{}' for {} is not in the dataset and no ionization table is available",
                    line.field, line.identifier
                ),
            )
        })?;

        tracing::info!(
            field = %resolved.field,
            ion = %resolved.key,
            table = %table.display(),
            "deriving ion number density"
        );
        self.ion_balance
            .add_ion_number_density_field(&resolved, table, dataset)?;

        if !dataset.has_field(&line.field) {
            return Err(SpectraError::dataset(
                "DATA.FIELD_UNRESOLVED",
                format!(
                    "field '{}' for {} is still missing after ion-balance derivation",
                    line.field, line.identifier
                ),
            ));
        }
        Ok(())
    }
}

fn register_line(line: &Transition) -> SpectraResult<RegisteredLine> {
    let mass = atomic_mass(&line.element).ok_or_else(|| {
        SpectraError::dataset(
            "DATA.ATOMIC_MASS",
            format!(
                "no atomic mass is tabulated for element '{}' of {}",
                line.element, line.identifier
            ),
        )
    })?;

    tracing::debug!(
        label = %line.identifier,
        field = %line.field,
        wavelength = line.wavelength,
        "registering line"
    );
    Ok(RegisteredLine {
        label: line.identifier.clone(),
        field: line.field.clone(),
        wavelength: line.wavelength,
        f_value: line.f_value,
        gamma: line.gamma,
        atomic_mass: mass,
        label_threshold: LINE_LABEL_THRESHOLD,
    })
}

#[cfg(test)]
mod tests {
    use super::{SynthesisOrchestrator, SynthesisRequest};
    use crate::domain::{
        GridResolution, SpectraError, SpectraErrorCategory, SpectraResult, WavelengthGrid,
    };
    use crate::lines::{IonKey, ResolvedIonField, Transition};
    use crate::synthesis::{
        DepositionEngine, DepositionRequest, IonBalance, Parallelism, SightlineDataset,
    };
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    #[derive(Default)]
    struct MockDataset {
        native: Vec<(String, Vec<f64>)>,
        derived: Vec<(String, Vec<f64>)>,
    }

    impl MockDataset {
        fn with_native(fields: &[&str]) -> Self {
            let mut native = vec![("density".to_string(), vec![2.0, 4.0])];
            native.extend(fields.iter().map(|field| (field.to_string(), vec![1.0, 1.0])));
            Self {
                native,
                derived: Vec::new(),
            }
        }
    }

    impl SightlineDataset for MockDataset {
        fn field_list(&self) -> Vec<String> {
            self.native.iter().map(|(name, _)| name.clone()).collect()
        }

        fn derived_field_list(&self) -> Vec<String> {
            self.derived.iter().map(|(name, _)| name.clone()).collect()
        }

        fn field_values(&self, field: &str) -> SpectraResult<Vec<f64>> {
            self.native
                .iter()
                .chain(&self.derived)
                .find(|(name, _)| name == field)
                .map(|(_, values)| values.clone())
                .ok_or_else(|| SpectraError::dataset("DATA.FIELD", format!("no field {field}")))
        }

        fn add_derived_field(&mut self, field: &str, values: Vec<f64>) -> SpectraResult<()> {
            self.derived.push((field.to_string(), values));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingIonBalance {
        calls: RefCell<Vec<(IonKey, PathBuf)>>,
        skip: bool,
    }

    impl IonBalance for RecordingIonBalance {
        fn add_ion_number_density_field(
            &self,
            ion: &ResolvedIonField,
            ionization_table: &Path,
            dataset: &mut dyn SightlineDataset,
        ) -> SpectraResult<()> {
            self.calls
                .borrow_mut()
                .push((ion.key.clone(), ionization_table.to_path_buf()));
            if self.skip {
                return Ok(());
            }
            let density = dataset.field_values("density")?;
            let fraction = 1.0 / f64::from(ion.key.level + 1);
            dataset.add_derived_field(
                &ion.field,
                density.iter().map(|value| value * fraction).collect(),
            )
        }
    }

    struct AbsorbingEngine {
        depth: f64,
        seen: RefCell<Vec<(usize, bool, usize)>>,
        truncate: bool,
    }

    impl AbsorbingEngine {
        fn new(depth: f64) -> Self {
            Self {
                depth,
                seen: RefCell::new(Vec::new()),
                truncate: false,
            }
        }
    }

    impl DepositionEngine for AbsorbingEngine {
        fn deposit(
            &self,
            _dataset: &dyn SightlineDataset,
            request: &DepositionRequest<'_>,
        ) -> SpectraResult<Vec<f64>> {
            self.seen.borrow_mut().push((
                request.lines.len(),
                request.use_peculiar_velocity,
                request.plan.groups(),
            ));
            let mut flux = vec![1.0 - self.depth * request.lines.len() as f64; request.grid.len()];
            if self.truncate {
                flux.pop();
            }
            Ok(flux)
        }
    }

    struct FailingEngine;

    impl DepositionEngine for FailingEngine {
        fn deposit(
            &self,
            _dataset: &dyn SightlineDataset,
            _request: &DepositionRequest<'_>,
        ) -> SpectraResult<Vec<f64>> {
            Err(SpectraError::dataset("DATA.DEPOSITION", "ray has no cells"))
        }
    }

    fn grid() -> WavelengthGrid {
        WavelengthGrid::new(1200.0, 1300.0, GridResolution::Bins(101)).expect("grid should build")
    }

    fn lines() -> Vec<Transition> {
        vec![
            Transition::new("H", 1, 1215.67, 4.69e8, 0.416),
            Transition::new("Si", 3, 1206.5, 2.5e9, 1.63),
        ]
    }

    #[test]
    fn native_fields_are_deposited_without_derivation() {
        let grid = grid();
        let lines = lines();
        let mut dataset =
            MockDataset::with_native(&["H_p0_number_density", "Si_p2_number_density"]);
        let engine = AbsorbingEngine::new(0.1);
        let ion_balance = RecordingIonBalance::default();

        let flux = SynthesisOrchestrator::new(&engine, &ion_balance)
            .synthesize(
                &mut dataset,
                SynthesisRequest::new(&lines, &grid, 8).with_peculiar_velocity(false),
            )
            .expect("synthesis should succeed");

        assert_eq!(flux.len(), grid.len());
        assert!(flux.iter().all(|value| (value - 0.8).abs() < 1e-12));
        assert!(ion_balance.calls.borrow().is_empty());
        assert_eq!(engine.seen.borrow().as_slice(), &[(2, false, 2)]);
    }

    #[test]
    fn missing_fields_are_derived_from_the_ionization_table() {
        let grid = grid();
        let lines = lines();
        let mut dataset = MockDataset::with_native(&["H_p0_number_density"]);
        let engine = AbsorbingEngine::new(0.1);
        let ion_balance = RecordingIonBalance::default();
        let orchestrator = SynthesisOrchestrator::new(&engine, &ion_balance);

        assert_eq!(orchestrator.missing_fields(&dataset, &lines).len(), 1);
        orchestrator
            .synthesize(
                &mut dataset,
                SynthesisRequest::new(&lines, &grid, 4)
                    .with_parallelism(Parallelism::PerLine)
                    .with_ionization_table(Path::new("hm2012_hr.h5")),
            )
            .expect("synthesis should succeed");

        assert_eq!(
            ion_balance.calls.borrow().as_slice(),
            &[(IonKey::new("Si", 3), PathBuf::from("hm2012_hr.h5"))]
        );
        assert_eq!(
            dataset.derived,
            vec![("Si_p2_number_density".to_string(), vec![0.5, 1.0])]
        );
        assert_eq!(engine.seen.borrow()[0].2, 4);
    }

    #[test]
    fn unresolvable_fields_are_dataset_errors() {
        let grid = grid();
        let engine = AbsorbingEngine::new(0.1);
        let ion_balance = RecordingIonBalance::default();
        let orchestrator = SynthesisOrchestrator::new(&engine, &ion_balance);
        let table = Path::new("hm2012_hr.h5");

        let opaque = vec![Transition::new("H", 1, 1215.67, 4.69e8, 0.416).with_field("density")];
        let error = orchestrator
            .synthesize(
                &mut MockDataset::default(),
                SynthesisRequest::new(&opaque, &grid, 1).with_ionization_table(table),
            )
            .expect_err("opaque field should fail");
        assert_eq!(error.category(), SpectraErrorCategory::Dataset);

        let lines = lines();
        let error = orchestrator
            .synthesize(&mut MockDataset::default(), SynthesisRequest::new(&lines, &grid, 1))
            .expect_err("missing table should fail");
        assert_eq!(error.placeholder(), "DATA.ION_TABLE_MISSING");

        let lazy = RecordingIonBalance {
            skip: true,
            ..RecordingIonBalance::default()
        };
        let error = SynthesisOrchestrator::new(&engine, &lazy)
            .synthesize(
                &mut MockDataset::default(),
                SynthesisRequest::new(&lines, &grid, 1).with_ionization_table(table),
            )
            .expect_err("underived field should fail");
        assert_eq!(error.placeholder(), "DATA.FIELD_UNRESOLVED");
    }

    #[test]
    fn unknown_atomic_mass_is_a_dataset_error() {
        let grid = grid();
        let lines = vec![Transition::new("Kr", 1, 1235.8, 1.0e8, 0.2).with_field("kr")];
        let mut dataset = MockDataset::with_native(&["kr"]);
        let engine = AbsorbingEngine::new(0.1);
        let ion_balance = RecordingIonBalance::default();

        let error = SynthesisOrchestrator::new(&engine, &ion_balance)
            .synthesize(&mut dataset, SynthesisRequest::new(&lines, &grid, 1))
            .expect_err("krypton has no tabulated mass");
        assert_eq!(error.placeholder(), "DATA.ATOMIC_MASS");
    }

    #[test]
    fn engine_output_must_match_the_grid() {
        let grid = grid();
        let lines = lines();
        let mut dataset =
            MockDataset::with_native(&["H_p0_number_density", "Si_p2_number_density"]);
        let ion_balance = RecordingIonBalance::default();
        let mut engine = AbsorbingEngine::new(0.1);
        engine.truncate = true;

        let error = SynthesisOrchestrator::new(&engine, &ion_balance)
            .synthesize(&mut dataset, SynthesisRequest::new(&lines, &grid, 1))
            .expect_err("short flux should fail");
        assert_eq!(error.placeholder(), "DATA.FLUX_SHAPE");

        let error = SynthesisOrchestrator::new(&FailingEngine, &ion_balance)
            .synthesize(&mut dataset, SynthesisRequest::new(&lines, &grid, 1))
            .expect_err("engine errors propagate");
        assert_eq!(error.placeholder(), "DATA.DEPOSITION");
    }

    #[test]
    fn empty_selection_is_rejected() {
        let grid = grid();
        let engine = AbsorbingEngine::new(0.1);
        let ion_balance = RecordingIonBalance::default();
        let error = SynthesisOrchestrator::new(&engine, &ion_balance)
            .synthesize(&mut MockDataset::default(), SynthesisRequest::new(&[], &grid, 1))
            .expect_err("empty selection should fail");
        assert_eq!(error.category(), SpectraErrorCategory::Selection);
    }
}
