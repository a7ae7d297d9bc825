use super::io_error;
use crate::domain::{SpectraResult, Spectrum};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub(super) fn write(spectrum: &Spectrum, path: &Path) -> SpectraResult<()> {
    let file = File::create(path).map_err(|source| io_error("IO.SPECTRUM_WRITE", path, source))?;
    let mut writer = BufWriter::new(file);
    write_rows(&mut writer, spectrum)
        .and_then(|_| writer.flush())
        .map_err(|source| io_error("IO.SPECTRUM_WRITE", path, source))
}

fn write_rows(writer: &mut impl Write, spectrum: &Spectrum) -> std::io::Result<()> {
    writeln!(writer, "#wavelength flux")?;
    for (wavelength, flux) in spectrum.wavelength().iter().zip(spectrum.flux()) {
        writeln!(
            writer,
            "{} {}",
            format_scientific(*wavelength),
            format_scientific(*flux)
        )?;
    }
    Ok(())
}

/// Six-digit scientific notation with a signed, two-digit exponent (`1.215670e+03`).
pub fn format_scientific(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{:.6e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => formatted,
    }
}
