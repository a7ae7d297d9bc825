use super::{FLUX_COLUMN, WAVELENGTH_COLUMN};
use crate::domain::{SpectraError, SpectraResult, Spectrum};
use fitsio::FitsFile;
use fitsio::tables::{ColumnDataType, ColumnDescription};
use std::path::Path;

pub const SPECTRUM_EXTENSION: &str = "SPECTRUM";

/// Empty primary HDU followed by a `SPECTRUM` binary table of doubles.
pub(super) fn write(spectrum: &Spectrum, path: &Path) -> SpectraResult<()> {
    let fits_error = |source: fitsio::errors::Error| {
        SpectraError::io_system(
            "IO.FITS_WRITE",
            format!("{}: {}", path.display(), source),
        )
    };

    let mut fptr = FitsFile::create(path)
        .overwrite()
        .open()
        .map_err(fits_error)?;
    let columns = [WAVELENGTH_COLUMN, FLUX_COLUMN]
        .into_iter()
        .map(|name| {
            ColumnDescription::new(name)
                .with_type(ColumnDataType::Double)
                .create()
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(fits_error)?;

    let hdu = fptr
        .create_table(SPECTRUM_EXTENSION.to_string(), &columns)
        .map_err(fits_error)?;
    hdu.write_col(&mut fptr, WAVELENGTH_COLUMN, spectrum.wavelength())
        .map_err(fits_error)?;
    hdu.write_col(&mut fptr, FLUX_COLUMN, spectrum.flux())
        .map_err(fits_error)?;
    Ok(())
}
