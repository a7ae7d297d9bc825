//! Parquet table with `wavelength` and `flux` columns. Used for `.h5` paths as
//! well, so those files are Parquet on disk rather than HDF5.

use super::{FLUX_COLUMN, WAVELENGTH_COLUMN, io_error};
use crate::domain::{SpectraError, SpectraResult, Spectrum, WavelengthGrid};
use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(WAVELENGTH_COLUMN, DataType::Float64, false),
        Field::new(FLUX_COLUMN, DataType::Float64, false),
    ]))
}

pub(super) fn write(spectrum: &Spectrum, path: &Path) -> SpectraResult<()> {
    let schema = schema();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from(spectrum.wavelength().to_vec())),
        Arc::new(Float64Array::from(spectrum.flux().to_vec())),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|source| binary_error(path, source))?;

    let file = File::create(path).map_err(|source| io_error("IO.SPECTRUM_WRITE", path, source))?;
    let mut writer =
        ArrowWriter::try_new(file, schema, None).map_err(|source| binary_error(path, source))?;
    writer
        .write(&batch)
        .map_err(|source| binary_error(path, source))?;
    writer
        .close()
        .map_err(|source| binary_error(path, source))?;
    Ok(())
}

pub(super) fn read(path: &Path) -> SpectraResult<Spectrum> {
    let file = File::open(path).map_err(|source| io_error("IO.SPECTRUM_READ", path, source))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|builder| builder.build())
        .map_err(|source| binary_error(path, source))?;

    let mut wavelength = Vec::new();
    let mut flux = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|source| binary_error(path, source))?;
        wavelength.extend_from_slice(float_column(&batch, WAVELENGTH_COLUMN, path)?.values());
        flux.extend_from_slice(float_column(&batch, FLUX_COLUMN, path)?.values());
    }

    let grid = WavelengthGrid::from_values(wavelength)
        .map_err(|source| binary_error(path, source))?;
    Spectrum::new(grid, flux)
}

fn float_column<'b>(
    batch: &'b RecordBatch,
    name: &str,
    path: &Path,
) -> SpectraResult<&'b Float64Array> {
    let column = batch.column_by_name(name).ok_or_else(|| {
        binary_error(path, format!("missing '{}' column", name))
    })?;
    let values = column
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| {
            binary_error(
                path,
                format!("'{}' column is {}, expected Float64", name, column.data_type()),
            )
        })?;
    if values.null_count() > 0 {
        return Err(binary_error(
            path,
            format!("'{}' column contains {} nulls", name, values.null_count()),
        ));
    }
    Ok(values)
}

fn binary_error(path: &Path, source: impl std::fmt::Display) -> SpectraError {
    SpectraError::format(
        "FORMAT.BINARY_TABLE",
        format!("{}: {}", path.display(), source),
    )
}
