//! Export normalized series and fact sets.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::domain::{FactSet, Series};
use crate::error::AppError;

/// Write a series as `date,value` CSV, oldest first.
pub fn write_series_csv(path: &Path, series: &Series) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_series_csv_to(&mut out, series)?;
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

pub fn write_series_csv_to(out: &mut impl Write, series: &Series) -> Result<(), AppError> {
    writeln!(out, "date,value").map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;
    for p in &series.observations {
        writeln!(out, "{},{}", p.date, p.value)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    Ok(())
}

/// Write a series as pretty JSON (`series`, `observations`, `units`, `frequency`).
pub fn write_series_json(path: &Path, series: &Series) -> Result<(), AppError> {
    write_json(path, series)
}

/// Write a fact set as pretty JSON.
pub fn write_facts_json(path: &Path, facts: &FactSet) -> Result<(), AppError> {
    write_json(path, facts)
}

/// Dispatch on extension: `.json` writes JSON, anything else CSV.
pub fn write_series(path: &Path, series: &Series) -> Result<(), AppError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => write_series_json(path, series),
        _ => write_series_csv(path, series),
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))
}
