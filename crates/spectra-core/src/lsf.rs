//! Line-spread-function kernels and their application to a spectrum.

use crate::config::{DataPaths, LSF_KERNELS_SUBDIR};
use crate::domain::{MAX_GRID_BINS, SpectraError, SpectraResult, Spectrum};
use crate::instrument::InstrumentProfile;
use crate::numerics::convolve_same;
use std::fs;
use std::path::{Path, PathBuf};

pub const BOXCAR: &str = "boxcar";
pub const GAUSSIAN: &str = "gaussian";

/// Where the kernel for [`apply_lsf`] comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelSource {
    /// The active instrument's default kernel file.
    InstrumentDefault,
    File(PathBuf),
    Function { name: String, width: Option<f64> },
}

impl KernelSource {
    pub fn function(name: impl Into<String>, width: f64) -> Self {
        Self::Function {
            name: name.into(),
            width: Some(width),
        }
    }
}

/// Generated kernels longer than the largest grid could never be applied.
fn check_kernel_samples(function: &str, width: f64, samples: f64) -> SpectraResult<usize> {
    if samples > MAX_GRID_BINS as f64 {
        return Err(SpectraError::configuration(
            "CONFIG.LSF_WIDTH",
            format!(
                "{} width {} needs {} samples, more than the {} bins any grid may hold",
                function, width, samples, MAX_GRID_BINS
            ),
        ));
    }
    Ok(samples as usize)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LsfKernel {
    weights: Vec<f64>,
}

impl LsfKernel {
    pub fn from_weights(weights: Vec<f64>) -> SpectraResult<Self> {
        if weights.is_empty() {
            return Err(SpectraError::configuration(
                "CONFIG.LSF_KERNEL",
                "LSF kernel has no weights",
            ));
        }
        if let Some((index, value)) = weights
            .iter()
            .copied()
            .enumerate()
            .find(|(_, value)| !value.is_finite())
        {
            return Err(SpectraError::configuration(
                "CONFIG.LSF_KERNEL",
                format!("LSF weight {} is not finite: {}", index, value),
            ));
        }
        Ok(Self { weights })
    }

    /// Loads one weight per line, as written. Blank and `#` lines are skipped.
    pub fn from_file(path: &Path) -> SpectraResult<Self> {
        let source = fs::read_to_string(path).map_err(|source| {
            SpectraError::io_system(
                "IO.LSF_READ",
                format!("failed to read LSF kernel '{}': {}", path.display(), source),
            )
        })?;

        let mut weights = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let token = trimmed.split_whitespace().next().unwrap_or(trimmed);
            let weight = token.parse::<f64>().map_err(|_| {
                SpectraError::configuration(
                    "CONFIG.LSF_KERNEL",
                    format!(
                        "{}:{}: '{}' is not a kernel weight",
                        path.display(),
                        index + 1,
                        token
                    ),
                )
            })?;
            weights.push(weight);
        }

        Self::from_weights(weights)
    }

    /// `width` equal weights of `1 / width`. Even widths lose one sample.
    pub fn boxcar(width: f64) -> SpectraResult<Self> {
        if !width.is_finite() || width < 1.0 || width.fract() != 0.0 {
            return Err(SpectraError::configuration(
                "CONFIG.LSF_WIDTH",
                format!("boxcar width must be a positive integer, got {}", width),
            ));
        }

        let mut size = check_kernel_samples(BOXCAR, width, width)?;
        if size % 2 == 0 {
            tracing::warn!(
                "boxcar LSF width {} is even; using {} so the kernel stays centered",
                size,
                size - 1
            );
            size -= 1;
        }
        Self::from_weights(vec![1.0 / size as f64; size])
    }

    /// Normalized Gaussian with standard deviation `width` bins, sampled over
    /// the odd number of bins nearest above `8 * width`.
    pub fn gaussian(width: f64) -> SpectraResult<Self> {
        if !width.is_finite() || width <= 0.0 {
            return Err(SpectraError::configuration(
                "CONFIG.LSF_WIDTH",
                format!("gaussian width must be positive, got {}", width),
            ));
        }

        let mut size = check_kernel_samples(GAUSSIAN, width, (8.0 * width).ceil())?;
        if size % 2 == 0 {
            size += 1;
        }
        let center = (size / 2) as f64;
        let raw: Vec<f64> = (0..size)
            .map(|index| {
                let offset = index as f64 - center;
                (-offset * offset / (2.0 * width * width)).exp()
            })
            .collect();
        let total: f64 = raw.iter().sum();
        Self::from_weights(raw.into_iter().map(|value| value / total).collect())
    }

    pub fn from_function(name: &str, width: Option<f64>) -> SpectraResult<Self> {
        let width = width.ok_or_else(|| {
            SpectraError::configuration(
                "CONFIG.LSF_WIDTH",
                format!("LSF function '{}' requires a width", name),
            )
        })?;
        match name {
            BOXCAR => Self::boxcar(width),
            GAUSSIAN => Self::gaussian(width),
            _ => Err(SpectraError::configuration(
                "CONFIG.LSF_FUNCTION",
                format!(
                    "unknown LSF function '{}'; valid functions are: {}, {}",
                    name, BOXCAR, GAUSSIAN
                ),
            )),
        }
    }

    /// Builds the kernel for `source`, looking up kernel files under the data
    /// directory's `lsf_kernels/` first.
    pub fn resolve(
        source: &KernelSource,
        instrument: &InstrumentProfile,
        paths: &DataPaths,
    ) -> SpectraResult<Self> {
        match source {
            KernelSource::InstrumentDefault => {
                let name = instrument.lsf_kernel().ok_or_else(|| {
                    SpectraError::configuration(
                        "CONFIG.LSF_MISSING",
                        format!(
                            "instrument {} has no default LSF; specify a kernel file or function",
                            instrument.name()
                        ),
                    )
                })?;
                tracing::info!(
                    "Applying default line spread function for {}.",
                    instrument.name()
                );
                Self::from_file(&resolve_kernel_file(paths, name)?)
            }
            KernelSource::File(name) => {
                tracing::info!("Applying specified line spread function.");
                Self::from_file(&resolve_kernel_file(paths, name)?)
            }
            KernelSource::Function { name, width } => {
                tracing::info!("Applying specified line spread function.");
                Self::from_function(name, *width)
            }
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

fn resolve_kernel_file(paths: &DataPaths, name: &Path) -> SpectraResult<PathBuf> {
    paths.resolve_required(LSF_KERNELS_SUBDIR, name, "CONFIG.LSF_MISSING", "LSF kernel")
}

/// Convolves the spectrum's flux with `kernel`, keeping its length.
pub fn apply_lsf(spectrum: &mut Spectrum, kernel: &LsfKernel) -> SpectraResult<()> {
    let convolved = convolve_same(kernel.weights(), spectrum.flux())?;
    spectrum.replace_flux(convolved)
}
