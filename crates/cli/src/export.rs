//! Enriched distributor CSV: the distributor's own columns in their
//! original order, then Quantity, Match Type, Matching Products and
//! Grade Counts.

use std::io::Write;
use std::path::Path;

use stockmatch_recon::classify::{output_values, OUTPUT_COLUMNS};
use stockmatch_recon::model::EnrichedRow;

use crate::exit_codes::EXIT_RECON_RUNTIME;
use crate::CliError;

pub fn write_enriched_csv<W: Write>(
    writer: W,
    headers: &[String],
    rows: &[EnrichedRow],
) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    // Always write the header, even with zero rows.
    let header_row: Vec<&str> = headers
        .iter()
        .map(String::as_str)
        .chain(OUTPUT_COLUMNS)
        .collect();
    wtr.write_record(&header_row)?;

    for row in rows {
        wtr.write_record(output_values(row, headers))?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_enriched_csv_file(
    path: &Path,
    headers: &[String],
    rows: &[EnrichedRow],
) -> Result<(), CliError> {
    let file = std::fs::File::create(path).map_err(|e| CliError {
        code: EXIT_RECON_RUNTIME,
        message: format!("cannot write {}: {e}", path.display()),
        hint: None,
    })?;
    write_enriched_csv(file, headers, rows).map_err(|e| CliError {
        code: EXIT_RECON_RUNTIME,
        message: format!("cannot write {}: {e}", path.display()),
        hint: None,
    })
}
