//! CSV export for per-tick village records.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::village::VillageStep;

/// Column header for CSV telemetry export.
const HEADER: &str = "timeslot,at,village,day,quarter,temperature,\
                       base_kwh,controllable_kwh,charge,failures";

/// Exports village steps to a CSV file at the given path.
///
/// Writes a header row followed by one row per village and timeslot.
/// Produces deterministic output for identical inputs.
///
/// # Arguments
///
/// * `steps` - Village steps in activation order
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(steps: &[VillageStep], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(steps, buf)
}

/// Writes village steps as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(steps: &[VillageStep], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for s in steps {
        wtr.write_record(&[
            s.timeslot.to_string(),
            s.at.to_rfc3339(),
            s.village.clone(),
            s.day.to_string(),
            s.quarter.to_string(),
            s.temperature.map_or_else(String::new, |t| format!("{t:.2}")),
            format!("{:.4}", s.base_kwh),
            format!("{:.4}", s.controllable_kwh),
            format!("{:.4}", s.charge),
            s.failures.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
