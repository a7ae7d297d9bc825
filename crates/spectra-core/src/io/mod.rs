//! Spectrum persistence.
//!
//! Three formats are written: a columnar binary table (Parquet, the only
//! format that can be read back), a FITS binary table, and plain ASCII. The
//! format follows the file extension unless one is named explicitly.
//!
//! Files named `.h5` are selected as [`SpectrumFormat::Binary`] for
//! compatibility with existing pipeline paths, but their contents are Parquet,
//! not HDF5. HDF5 readers such as h5py cannot open them; use a Parquet reader
//! (pyarrow, polars) or [`load`] instead.

mod ascii;
mod binary;
#[cfg(feature = "fits")]
mod fits;

use crate::domain::{SpectraError, SpectraResult, Spectrum};
use std::fmt::{Display, Formatter};
use std::path::Path;

pub use ascii::format_scientific;

pub const WAVELENGTH_COLUMN: &str = "wavelength";
pub const FLUX_COLUMN: &str = "flux";

const BINARY_EXTENSIONS: [&str; 2] = ["h5", "parquet"];
const FITS_EXTENSIONS: [&str; 1] = ["fits"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumFormat {
    Binary,
    Fits,
    Ascii,
}

impl SpectrumFormat {
    /// Explicit format names, case-insensitive. `HDF5` names the binary table.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "HDF5" | "H5" | "PARQUET" | "BINARY" => Some(Self::Binary),
            "FITS" => Some(Self::Fits),
            "ASCII" | "TEXT" | "TXT" => Some(Self::Ascii),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some(extension) if BINARY_EXTENSIONS.contains(&extension) => Self::Binary,
            Some(extension) if FITS_EXTENSIONS.contains(&extension) => Self::Fits,
            _ => Self::Ascii,
        }
    }

    /// An explicit name wins over the extension. Unknown names fall back to ASCII.
    pub fn select(path: &Path, explicit: Option<&str>) -> Self {
        match explicit {
            None => Self::from_extension(path),
            Some(name) => Self::from_name(name).unwrap_or_else(|| {
                tracing::warn!(
                    "Invalid format '{}'. Must be 'HDF5', 'FITS', 'ASCII'. Defaulting to ASCII.",
                    name
                );
                Self::Ascii
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "HDF5",
            Self::Fits => "FITS",
            Self::Ascii => "ASCII",
        }
    }
}

impl Display for SpectrumFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn save(spectrum: &Spectrum, path: &Path) -> SpectraResult<SpectrumFormat> {
    save_with_format(spectrum, path, None)
}

/// Writes `spectrum` to `path` and returns the format actually used.
pub fn save_with_format(
    spectrum: &Spectrum,
    path: &Path,
    format: Option<&str>,
) -> SpectraResult<SpectrumFormat> {
    let format = SpectrumFormat::select(path, format);
    tracing::info!(path = %path.display(), format = %format, "writing spectrum");
    match format {
        SpectrumFormat::Binary => binary::write(spectrum, path)?,
        SpectrumFormat::Fits => write_fits(spectrum, path)?,
        SpectrumFormat::Ascii => ascii::write(spectrum, path)?,
    }
    Ok(format)
}

/// Reads a spectrum written in the binary table format.
pub fn load(path: &Path) -> SpectraResult<Spectrum> {
    if SpectrumFormat::from_extension(path) != SpectrumFormat::Binary {
        return Err(SpectraError::format(
            "FORMAT.LOAD_UNSUPPORTED",
            format!(
                "only binary tables ({}) can be loaded, got '{}'",
                BINARY_EXTENSIONS
                    .iter()
                    .map(|extension| format!(".{}", extension))
                    .collect::<Vec<_>>()
                    .join(", "),
                path.display()
            ),
        ));
    }
    binary::read(path)
}

#[cfg(feature = "fits")]
fn write_fits(spectrum: &Spectrum, path: &Path) -> SpectraResult<()> {
    fits::write(spectrum, path)
}

#[cfg(not(feature = "fits"))]
fn write_fits(_spectrum: &Spectrum, path: &Path) -> SpectraResult<()> {
    Err(SpectraError::format(
        "FORMAT.FITS_DISABLED",
        format!(
            "cannot write '{}': FITS support is not compiled in (enable the `fits` feature)",
            path.display()
        ),
    ))
}

fn io_error(placeholder: &'static str, path: &Path, source: impl Display) -> SpectraError {
    SpectraError::io_system(placeholder, format!("{}: {}", path.display(), source))
}
