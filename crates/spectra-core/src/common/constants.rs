//! Shared physical and pipeline constants.

/// Upper wavelength bound (angstroms) of the tabulated Milky-Way foreground.
/// Targets at or beyond this bound receive an unabsorbed flux of 1.
pub const MILKY_WAY_COVERAGE_LIMIT: f64 = 1799.9444;

/// Minimum column density for which the deposition engine labels a line.
pub const LINE_LABEL_THRESHOLD: f64 = 1.0e3;

/// Suffix shared by every ion number-density field.
pub const NUMBER_DENSITY_SUFFIX: &str = "number_density";
