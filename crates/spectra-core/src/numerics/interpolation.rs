use crate::domain::SpectraError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateInterpolationInput<'a> {
    pub template_wavelength: &'a [f64],
    pub template_flux: &'a [f64],
    pub target_wavelength: &'a [f64],
    pub redshift: f64,
}

impl<'a> TemplateInterpolationInput<'a> {
    pub fn new(
        template_wavelength: &'a [f64],
        template_flux: &'a [f64],
        target_wavelength: &'a [f64],
    ) -> Self {
        Self {
            template_wavelength,
            template_flux,
            target_wavelength,
            redshift: 0.0,
        }
    }

    pub fn with_redshift(mut self, redshift: f64) -> Self {
        self.redshift = redshift;
        self
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolationError {
    #[error("template interpolation requires at least 2 rows, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("template length mismatch: wavelength={wavelength}, flux={flux}")]
    LengthMismatch { wavelength: usize, flux: usize },
    #[error("template wavelength must be finite at index {index}, got {value}")]
    NonFiniteWavelength { index: usize, value: f64 },
    #[error(
        "template wavelengths must be strictly increasing, index {index} has {current} after {previous}"
    )]
    NonIncreasingWavelength {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("redshift must be finite and > -1, got {value}")]
    InvalidRedshift { value: f64 },
}

impl From<InterpolationError> for SpectraError {
    fn from(error: InterpolationError) -> Self {
        SpectraError::configuration("CONFIG.TEMPLATE_INTERPOLATION", error.to_string())
    }
}

/// Piecewise-linear resampling of a tabulated spectrum onto target wavelengths.
///
/// Template wavelengths are shifted by `λ + λ·z` before bracketing. The bracket
/// index is the count of template wavelengths `<= target`, clamped to
/// `[1, len - 1]`, so targets beyond the table extrapolate along the edge
/// segment instead of saturating.
pub fn interpolate_template(
    input: TemplateInterpolationInput<'_>,
) -> Result<Vec<f64>, InterpolationError> {
    if !input.redshift.is_finite() || input.redshift <= -1.0 {
        return Err(InterpolationError::InvalidRedshift {
            value: input.redshift,
        });
    }

    let shifted: Vec<f64> = input
        .template_wavelength
        .iter()
        .map(|wavelength| wavelength + wavelength * input.redshift)
        .collect();
    validate_template(&shifted, input.template_flux)?;

    let flux = input.template_flux;
    let last = shifted.len() - 1;

    Ok(input
        .target_wavelength
        .iter()
        .map(|target| {
            let upper = shifted
                .partition_point(|wavelength| wavelength <= target)
                .clamp(1, last);
            let lower = upper - 1;
            let slope = (flux[upper] - flux[lower]) / (shifted[upper] - shifted[lower]);
            slope * (target - shifted[upper]) + flux[upper]
        })
        .collect())
}

fn validate_template(wavelength: &[f64], flux: &[f64]) -> Result<(), InterpolationError> {
    if wavelength.len() != flux.len() {
        return Err(InterpolationError::LengthMismatch {
            wavelength: wavelength.len(),
            flux: flux.len(),
        });
    }
    if wavelength.len() < 2 {
        return Err(InterpolationError::InsufficientPoints {
            actual: wavelength.len(),
        });
    }

    for (index, value) in wavelength.iter().copied().enumerate() {
        if !value.is_finite() {
            return Err(InterpolationError::NonFiniteWavelength { index, value });
        }
        if index > 0 {
            let previous = wavelength[index - 1];
            if value <= previous {
                return Err(InterpolationError::NonIncreasingWavelength {
                    index,
                    previous,
                    current: value,
                });
            }
        }
    }

    Ok(())
}
