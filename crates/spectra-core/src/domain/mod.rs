pub mod errors;

pub use errors::{SpectraError, SpectraErrorCategory, SpectraResult};

/// Upper bound on grid size; larger requests are rejected before allocation.
pub const MAX_GRID_BINS: usize = 100_000_000;

/// Requested bin layout for a wavelength grid: either a bin count or a bin width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridResolution {
    Bins(usize),
    Width(f64),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("wavelength range must be finite, got [{lambda_min}, {lambda_max}]")]
    NonFiniteRange { lambda_min: f64, lambda_max: f64 },
    #[error("lambda_max ({lambda_max}) must be greater than lambda_min ({lambda_min})")]
    EmptyRange { lambda_min: f64, lambda_max: f64 },
    #[error("wavelength grid requires at least 2 bins, got {actual}")]
    TooFewBins { actual: usize },
    #[error("wavelength grid may hold at most {limit} bins, requested {requested}")]
    TooManyBins { requested: f64, limit: usize },
    #[error("bin width must be finite and > 0, got {value}")]
    InvalidWidth { value: f64 },
    #[error("wavelength entry must be finite at index {index}, got {value}")]
    NonFiniteWavelength { index: usize, value: f64 },
    #[error(
        "wavelengths must be strictly increasing, index {index} has {current} after {previous}"
    )]
    NonIncreasing {
        index: usize,
        previous: f64,
        current: f64,
    },
}

impl From<GridError> for SpectraError {
    fn from(error: GridError) -> Self {
        SpectraError::configuration("CONFIG.WAVELENGTH_GRID", error.to_string())
    }
}

/// Strictly increasing wavelength bins in angstroms.
#[derive(Debug, Clone, PartialEq)]
pub struct WavelengthGrid {
    values: Vec<f64>,
}

impl WavelengthGrid {
    /// Evenly spaced bins with both endpoints included.
    ///
    /// A bin width is converted to a count with `round(range / width) + 1`, so
    /// `1150..1450` at `0.01` yields 30001 bins rather than losing the last one
    /// to floating-point truncation.
    pub fn new(
        lambda_min: f64,
        lambda_max: f64,
        resolution: GridResolution,
    ) -> Result<Self, GridError> {
        if !lambda_min.is_finite() || !lambda_max.is_finite() {
            return Err(GridError::NonFiniteRange {
                lambda_min,
                lambda_max,
            });
        }
        if lambda_max <= lambda_min {
            return Err(GridError::EmptyRange {
                lambda_min,
                lambda_max,
            });
        }

        let n_lambda = match resolution {
            GridResolution::Bins(count) => count,
            GridResolution::Width(width) => {
                if !width.is_finite() || width <= 0.0 {
                    return Err(GridError::InvalidWidth { value: width });
                }
                let intervals = ((lambda_max - lambda_min) / width).round();
                if !intervals.is_finite() || intervals >= MAX_GRID_BINS as f64 {
                    return Err(GridError::TooManyBins {
                        requested: intervals + 1.0,
                        limit: MAX_GRID_BINS,
                    });
                }
                (intervals as usize)
                    .checked_add(1)
                    .ok_or(GridError::TooManyBins {
                        requested: intervals + 1.0,
                        limit: MAX_GRID_BINS,
                    })?
            }
        };
        if n_lambda > MAX_GRID_BINS {
            return Err(GridError::TooManyBins {
                requested: n_lambda as f64,
                limit: MAX_GRID_BINS,
            });
        }
        if n_lambda < 2 {
            return Err(GridError::TooFewBins { actual: n_lambda });
        }

        let step = (lambda_max - lambda_min) / (n_lambda - 1) as f64;
        let mut values: Vec<f64> = (0..n_lambda)
            .map(|index| lambda_min + index as f64 * step)
            .collect();
        values[n_lambda - 1] = lambda_max;

        Ok(Self { values })
    }

    /// Wraps explicit wavelengths, e.g. from a persisted spectrum.
    pub fn from_values(values: Vec<f64>) -> Result<Self, GridError> {
        if values.len() < 2 {
            return Err(GridError::TooFewBins {
                actual: values.len(),
            });
        }
        for (index, value) in values.iter().copied().enumerate() {
            if !value.is_finite() {
                return Err(GridError::NonFiniteWavelength { index, value });
            }
            if index > 0 {
                let previous = values[index - 1];
                if value <= previous {
                    return Err(GridError::NonIncreasing {
                        index,
                        previous,
                        current: value,
                    });
                }
            }
        }
        Ok(Self { values })
    }

    pub fn lambda_min(&self) -> f64 {
        self.values[0]
    }

    pub fn lambda_max(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean bin width.
    pub fn dlambda(&self) -> f64 {
        (self.lambda_max() - self.lambda_min()) / (self.values.len() - 1) as f64
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// A flux field sampled on a wavelength grid. Flux of 1 means no absorption.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    grid: WavelengthGrid,
    flux: Vec<f64>,
}

impl Spectrum {
    pub fn flat(grid: WavelengthGrid) -> Self {
        let flux = vec![1.0; grid.len()];
        Self { grid, flux }
    }

    pub fn new(grid: WavelengthGrid, flux: Vec<f64>) -> SpectraResult<Self> {
        if grid.len() != flux.len() {
            return Err(SpectraError::format(
                "FORMAT.SPECTRUM_SHAPE",
                format!(
                    "spectrum length mismatch: wavelength={}, flux={}",
                    grid.len(),
                    flux.len()
                ),
            ));
        }
        Ok(Self { grid, flux })
    }

    pub fn grid(&self) -> &WavelengthGrid {
        &self.grid
    }

    pub fn wavelength(&self) -> &[f64] {
        self.grid.as_slice()
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn flux_mut(&mut self) -> &mut [f64] {
        &mut self.flux
    }

    pub fn len(&self) -> usize {
        self.flux.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flux.is_empty()
    }

    /// Replaces the flux while keeping the grid; the new flux must match its length.
    pub fn replace_flux(&mut self, flux: Vec<f64>) -> SpectraResult<()> {
        if flux.len() != self.grid.len() {
            return Err(SpectraError::format(
                "FORMAT.SPECTRUM_SHAPE",
                format!(
                    "replacement flux has {} bins, grid has {}",
                    flux.len(),
                    self.grid.len()
                ),
            ));
        }
        self.flux = flux;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{GridError, GridResolution, MAX_GRID_BINS, Spectrum, WavelengthGrid};
    use crate::domain::SpectraErrorCategory;

    #[test]
    fn width_resolution_includes_both_endpoints() {
        let grid = WavelengthGrid::new(1150.0, 1450.0, GridResolution::Width(0.01))
            .expect("grid should build");

        assert_eq!(grid.len(), 30_001);
        assert_eq!(grid.lambda_min(), 1150.0);
        assert_eq!(grid.lambda_max(), 1450.0);
        assert!((grid.dlambda() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn bin_resolution_derives_width() {
        let grid = WavelengthGrid::new(1000.0, 1010.0, GridResolution::Bins(11))
            .expect("grid should build");

        assert_eq!(grid.as_slice()[3], 1003.0);
        assert_eq!(grid.dlambda(), 1.0);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert!(matches!(
            WavelengthGrid::new(1450.0, 1150.0, GridResolution::Bins(10)),
            Err(GridError::EmptyRange { .. })
        ));
        assert!(matches!(
            WavelengthGrid::new(1150.0, 1450.0, GridResolution::Bins(1)),
            Err(GridError::TooFewBins { actual: 1 })
        ));
        assert!(matches!(
            WavelengthGrid::new(1150.0, 1450.0, GridResolution::Width(0.0)),
            Err(GridError::InvalidWidth { .. })
        ));
    }

    #[test]
    fn oversized_grids_fail_before_allocating() {
        let error = WavelengthGrid::new(1150.0, 1450.0, GridResolution::Width(1e-300))
            .expect_err("tiny width should be rejected");
        assert!(matches!(error, GridError::TooManyBins { .. }));

        let error = WavelengthGrid::new(1150.0, 1450.0, GridResolution::Bins(usize::MAX))
            .expect_err("huge bin count should be rejected");
        assert!(matches!(
            error,
            GridError::TooManyBins {
                limit: MAX_GRID_BINS,
                ..
            }
        ));

        let error: crate::domain::SpectraError = error.into();
        assert_eq!(error.category(), SpectraErrorCategory::Configuration);
    }

    #[test]
    fn explicit_values_must_increase() {
        let error = WavelengthGrid::from_values(vec![1.0, 2.0, 2.0])
            .expect_err("repeated wavelength should fail");
        assert!(matches!(error, GridError::NonIncreasing { index: 2, .. }));
    }

    #[test]
    fn flat_spectrum_matches_grid_length() {
        let grid = WavelengthGrid::new(1200.0, 1201.0, GridResolution::Bins(5))
            .expect("grid should build");
        let mut spectrum = Spectrum::flat(grid);

        assert_eq!(spectrum.len(), 5);
        assert!(spectrum.flux().iter().all(|value| *value == 1.0));
        assert!(spectrum.replace_flux(vec![0.5; 4]).is_err());
        spectrum
            .replace_flux(vec![0.5; 5])
            .expect("matching flux should be accepted");
        assert_eq!(spectrum.flux()[4], 0.5);
    }
}
