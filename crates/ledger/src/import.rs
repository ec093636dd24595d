//! Reading ledger rows from a CSV export of the legacy spreadsheet.

use crate::models::{LedgerRow, MalformedRecord, LEGACY_HEADER};
use std::io::Read;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Rows parsed from an export. `rejected` carries the 1-based line number
/// and reason for each line that could not become a row.
#[derive(Debug, Default)]
pub struct ParsedExport {
    pub rows: Vec<LedgerRow>,
    pub rejected: Vec<(usize, MalformedRecord)>,
}

/// Parses a spreadsheet export. The first line is skipped only when it is
/// exactly the legacy header; otherwise every line is data.
pub fn parse_legacy_csv<R: Read>(reader: R) -> Result<ParsedExport, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut parsed = ParsedExport::default();
    for (index, result) in csv_reader.records().enumerate() {
        let record = result?;
        let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();

        if index == 0 && is_legacy_header(&cells) {
            continue;
        }

        match LedgerRow::from_cells(&cells) {
            Ok(row) => parsed.rows.push(row),
            Err(e) => parsed.rejected.push((index + 1, e)),
        }
    }

    Ok(parsed)
}

fn is_legacy_header(cells: &[String]) -> bool {
    cells.len() == LEGACY_HEADER.len()
        && cells.iter().zip(LEGACY_HEADER.iter()).all(|(a, b)| a.trim() == *b)
}
