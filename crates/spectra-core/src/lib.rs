//! Calibration and post-processing of synthetic sightline absorption spectra.
//!
//! [`generator::SpectrumGenerator`] holds the active instrument, the line
//! catalog, and the current spectrum; the other modules provide the pieces it
//! strings together.

pub mod common;
pub mod config;
pub mod domain;
pub mod generator;
pub mod instrument;
pub mod io;
pub mod lines;
pub mod lsf;
pub mod numerics;
pub mod synthesis;
pub mod templates;

pub use domain::{SpectraError, SpectraErrorCategory, SpectraResult, Spectrum, WavelengthGrid};
pub use generator::{SpectrumGenerator, SynthesisOptions};
