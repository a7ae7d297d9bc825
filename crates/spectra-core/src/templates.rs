//! Tabulated reference spectra applied as multiplicative foregrounds.

use crate::common::constants::MILKY_WAY_COVERAGE_LIMIT;
use crate::domain::{SpectraError, SpectraResult, Spectrum};
use crate::numerics::{TemplateInterpolationInput, interpolate_template};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTemplate {
    wavelength: Vec<f64>,
    flux: Vec<f64>,
}

impl ReferenceTemplate {
    pub fn from_columns(wavelength: Vec<f64>, flux: Vec<f64>) -> SpectraResult<Self> {
        if wavelength.len() != flux.len() || wavelength.len() < 2 {
            return Err(SpectraError::configuration(
                "CONFIG.TEMPLATE_FORMAT",
                format!(
                    "template needs at least 2 rows of equal length, got wavelength={}, flux={}",
                    wavelength.len(),
                    flux.len()
                ),
            ));
        }
        Ok(Self { wavelength, flux })
    }

    /// Reads whitespace-delimited `wavelength flux` rows; extra columns are ignored.
    pub fn load(path: &Path) -> SpectraResult<Self> {
        let source = fs::read_to_string(path).map_err(|source| {
            SpectraError::io_system(
                "IO.TEMPLATE_READ",
                format!("failed to read template '{}': {}", path.display(), source),
            )
        })?;

        let mut wavelength = Vec::new();
        let mut flux = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut columns = trimmed.split_whitespace().map(str::parse::<f64>);
            match (columns.next(), columns.next()) {
                (Some(Ok(lambda)), Some(Ok(value))) => {
                    wavelength.push(lambda);
                    flux.push(value);
                }
                _ => {
                    return Err(SpectraError::configuration(
                        "CONFIG.TEMPLATE_FORMAT",
                        format!(
                            "{}:{}: expected two numeric columns",
                            path.display(),
                            index + 1
                        ),
                    ));
                }
            }
        }

        Self::from_columns(wavelength, flux)
    }

    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    pub fn interpolate(&self, target: &[f64], redshift: f64) -> SpectraResult<Vec<f64>> {
        let input = TemplateInterpolationInput::new(&self.wavelength, &self.flux, target)
            .with_redshift(redshift);
        Ok(interpolate_template(input)?)
    }
}

/// QSO continuum on `target`, with the template shifted to `redshift`.
pub fn qso_curve(
    template: &ReferenceTemplate,
    target: &[f64],
    redshift: f64,
) -> SpectraResult<Vec<f64>> {
    template.interpolate(target, redshift)
}

/// Milky-Way foreground on `target`; unity beyond the template's coverage.
pub fn milky_way_curve(template: &ReferenceTemplate, target: &[f64]) -> SpectraResult<Vec<f64>> {
    let mut curve = template.interpolate(target, 0.0)?;
    for (value, wavelength) in curve.iter_mut().zip(target) {
        if *wavelength >= MILKY_WAY_COVERAGE_LIMIT {
            *value = 1.0;
        }
    }
    Ok(curve)
}

pub fn apply_qso(
    spectrum: &mut Spectrum,
    template: &ReferenceTemplate,
    redshift: f64,
) -> SpectraResult<()> {
    let curve = qso_curve(template, spectrum.wavelength(), redshift)?;
    multiply(spectrum.flux_mut(), &curve);
    Ok(())
}

pub fn apply_milky_way(spectrum: &mut Spectrum, template: &ReferenceTemplate) -> SpectraResult<()> {
    let curve = milky_way_curve(template, spectrum.wavelength())?;
    multiply(spectrum.flux_mut(), &curve);
    Ok(())
}

fn multiply(flux: &mut [f64], curve: &[f64]) {
    for (value, factor) in flux.iter_mut().zip(curve) {
        *value *= factor;
    }
}
