//! Seams to the collaborators that own sightline data and optical depth.

use super::partition::PartitionPlan;
use crate::domain::{SpectraResult, WavelengthGrid};
use crate::lines::ResolvedIonField;
use serde::Serialize;
use std::path::Path;

/// Sampled quantities along one sightline.
pub trait SightlineDataset {
    /// Fields stored in the data itself.
    fn field_list(&self) -> Vec<String>;

    /// Fields computed on demand, including ones added by [`IonBalance`].
    fn derived_field_list(&self) -> Vec<String>;

    fn has_field(&self, field: &str) -> bool {
        self.field_list().iter().any(|name| name == field)
            || self.derived_field_list().iter().any(|name| name == field)
    }

    /// Per-cell values of a native or derived field.
    fn field_values(&self, field: &str) -> SpectraResult<Vec<f64>>;

    fn add_derived_field(&mut self, field: &str, values: Vec<f64>) -> SpectraResult<()>;
}

pub trait SightlineLoader {
    fn load(&self, path: &Path) -> SpectraResult<Box<dyn SightlineDataset>>;
}

/// Derives ion number densities from an ionization table.
pub trait IonBalance {
    fn add_ion_number_density_field(
        &self,
        ion: &ResolvedIonField,
        ionization_table: &Path,
        dataset: &mut dyn SightlineDataset,
    ) -> SpectraResult<()>;
}

/// A transition as handed to the deposition engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredLine {
    pub label: String,
    pub field: String,
    pub wavelength: f64,
    pub f_value: f64,
    pub gamma: f64,
    /// Atomic mass in amu.
    pub atomic_mass: f64,
    /// Column density below which the engine leaves the line unlabeled.
    pub label_threshold: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct DepositionRequest<'a> {
    pub lines: &'a [RegisteredLine],
    pub grid: &'a WavelengthGrid,
    pub use_peculiar_velocity: bool,
    pub plan: &'a PartitionPlan,
}

/// Turns registered lines into a transmitted flux on the request grid.
pub trait DepositionEngine {
    fn deposit(
        &self,
        dataset: &dyn SightlineDataset,
        request: &DepositionRequest<'_>,
    ) -> SpectraResult<Vec<f64>>;
}
