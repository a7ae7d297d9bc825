//! Spectrograph profiles: wavelength coverage, binning, and default LSF.

use crate::domain::{GridResolution, SpectraError, SpectraResult, WavelengthGrid};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const CUSTOM_INSTRUMENT_NAME: &str = "Custom";
pub const DEFAULT_INSTRUMENT_NAME: &str = "COS";

struct PresetSpec {
    name: &'static str,
    lambda_min: f64,
    lambda_max: f64,
    dlambda: f64,
    lsf_kernel: Option<&'static str>,
}

const PRESETS: [PresetSpec; 5] = [
    PresetSpec {
        name: "COS",
        lambda_min: 1150.0,
        lambda_max: 1450.0,
        dlambda: 0.01,
        lsf_kernel: Some("avg_COS.txt"),
    },
    PresetSpec {
        name: "HIRES",
        lambda_min: 1200.0,
        lambda_max: 1400.0,
        dlambda: 0.01,
        lsf_kernel: None,
    },
    PresetSpec {
        name: "UVES",
        lambda_min: 1200.0,
        lambda_max: 1400.0,
        dlambda: 0.01,
        lsf_kernel: None,
    },
    PresetSpec {
        name: "MODS",
        lambda_min: 1200.0,
        lambda_max: 1400.0,
        dlambda: 0.01,
        lsf_kernel: None,
    },
    PresetSpec {
        name: "SDSS",
        lambda_min: 1200.0,
        lambda_max: 1400.0,
        dlambda: 0.01,
        lsf_kernel: None,
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentProfile {
    name: String,
    grid: WavelengthGrid,
    lsf_kernel: Option<PathBuf>,
}

impl InstrumentProfile {
    pub fn new(name: impl Into<String>, range: &CustomRange) -> SpectraResult<Self> {
        let resolution = match (range.n_lambda, range.dlambda) {
            (Some(n_lambda), None) => GridResolution::Bins(n_lambda),
            (None, Some(dlambda)) => GridResolution::Width(dlambda),
            (Some(_), Some(_)) => {
                return Err(SpectraError::configuration(
                    "CONFIG.INSTRUMENT_RESOLUTION",
                    "specify exactly one of n_lambda or dlambda, not both",
                ));
            }
            (None, None) => {
                return Err(SpectraError::configuration(
                    "CONFIG.INSTRUMENT_RESOLUTION",
                    "a custom instrument requires either n_lambda or dlambda",
                ));
            }
        };

        let grid = WavelengthGrid::new(range.lambda_min, range.lambda_max, resolution)?;
        Ok(Self {
            name: name.into(),
            grid,
            lsf_kernel: range.lsf_kernel.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &WavelengthGrid {
        &self.grid
    }

    pub fn lambda_min(&self) -> f64 {
        self.grid.lambda_min()
    }

    pub fn lambda_max(&self) -> f64 {
        self.grid.lambda_max()
    }

    pub fn n_lambda(&self) -> usize {
        self.grid.len()
    }

    pub fn dlambda(&self) -> f64 {
        self.grid.dlambda()
    }

    pub fn lsf_kernel(&self) -> Option<&Path> {
        self.lsf_kernel.as_deref()
    }
}

impl Display for InstrumentProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {:.2}-{:.2} A, {} bins of {:.4} A",
            self.name,
            self.lambda_min(),
            self.lambda_max(),
            self.n_lambda(),
            self.dlambda()
        )?;
        if let Some(kernel) = &self.lsf_kernel {
            write!(f, ", LSF {}", kernel.display())?;
        }
        Ok(())
    }
}

/// Explicit wavelength coverage for an instrument outside the preset table.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomRange {
    pub lambda_min: f64,
    pub lambda_max: f64,
    pub n_lambda: Option<usize>,
    pub dlambda: Option<f64>,
    pub lsf_kernel: Option<PathBuf>,
}

impl CustomRange {
    pub fn with_bins(lambda_min: f64, lambda_max: f64, n_lambda: usize) -> Self {
        Self {
            lambda_min,
            lambda_max,
            n_lambda: Some(n_lambda),
            dlambda: None,
            lsf_kernel: None,
        }
    }

    pub fn with_width(lambda_min: f64, lambda_max: f64, dlambda: f64) -> Self {
        Self {
            lambda_min,
            lambda_max,
            n_lambda: None,
            dlambda: Some(dlambda),
            lsf_kernel: None,
        }
    }

    pub fn with_lsf_kernel(mut self, kernel: impl Into<PathBuf>) -> Self {
        self.lsf_kernel = Some(kernel.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentSelector {
    Preset(String),
    Custom(CustomRange),
    Profile(InstrumentProfile),
}

impl InstrumentSelector {
    pub fn preset(name: impl Into<String>) -> Self {
        Self::Preset(name.into())
    }
}

impl From<&str> for InstrumentSelector {
    fn from(name: &str) -> Self {
        Self::Preset(name.to_string())
    }
}

impl From<CustomRange> for InstrumentSelector {
    fn from(range: CustomRange) -> Self {
        Self::Custom(range)
    }
}

impl From<InstrumentProfile> for InstrumentSelector {
    fn from(profile: InstrumentProfile) -> Self {
        Self::Profile(profile)
    }
}

/// Read-only table of named instrument profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentRegistry {
    profiles: Vec<InstrumentProfile>,
}

impl InstrumentRegistry {
    /// Process-wide preset table, built on first use and never mutated.
    pub fn presets() -> &'static InstrumentRegistry {
        static PRESET_REGISTRY: OnceLock<InstrumentRegistry> = OnceLock::new();
        PRESET_REGISTRY.get_or_init(|| {
            let profiles = PRESETS
                .iter()
                .filter_map(|spec| {
                    let mut range =
                        CustomRange::with_width(spec.lambda_min, spec.lambda_max, spec.dlambda);
                    range.lsf_kernel = spec.lsf_kernel.map(PathBuf::from);
                    InstrumentProfile::new(spec.name, &range)
                        .map_err(|error| {
                            tracing::error!("preset instrument {} is invalid: {}", spec.name, error)
                        })
                        .ok()
                })
                .collect::<Vec<_>>();
            debug_assert_eq!(
                profiles.len(),
                PRESETS.len(),
                "every preset instrument should build"
            );
            InstrumentRegistry { profiles }
        })
    }

    pub fn from_profiles(profiles: Vec<InstrumentProfile>) -> Self {
        Self { profiles }
    }

    pub fn get(&self, name: &str) -> Option<&InstrumentProfile> {
        self.profiles.iter().find(|profile| profile.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|profile| profile.name()).collect()
    }

    pub fn profiles(&self) -> &[InstrumentProfile] {
        &self.profiles
    }

    pub fn resolve(&self, selector: &InstrumentSelector) -> SpectraResult<InstrumentProfile> {
        match selector {
            InstrumentSelector::Preset(name) => self.get(name).cloned().ok_or_else(|| {
                SpectraError::configuration(
                    "CONFIG.INSTRUMENT_UNKNOWN",
                    format!(
                        "unknown instrument '{}'; valid instruments are: {}",
                        name,
                        self.names().join(", ")
                    ),
                )
            }),
            InstrumentSelector::Custom(range) => InstrumentProfile::new(CUSTOM_INSTRUMENT_NAME, range),
            InstrumentSelector::Profile(profile) => Ok(profile.clone()),
        }
    }
}
