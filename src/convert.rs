use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use thiserror::Error;

use crate::storage::remove_quiet;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("unreadable spreadsheet: {0}")]
    Xlsx(#[from] calamine::XlsxError),
    #[error("workbook contains no sheets")]
    NoSheets,
    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializes the first sheet of the workbook at `input` to UTF-8 CSV at
/// `output`. The bytes land in a sibling `.part` file first and are
/// renamed into place, so `output` never holds a truncated file. Cell
/// contents are taken verbatim from the parser's display conversion.
pub fn convert_xlsx_to_csv(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let mut workbook: Xlsx<BufReader<File>> = open_workbook(input)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ConvertError::NoSheets)?;
    let range = workbook.worksheet_range(&sheet)?;

    let part = output.with_extension("csv.part");
    if let Err(e) = write_rows(&range, &part) {
        remove_quiet(&part);
        return Err(e);
    }
    if let Err(e) = std::fs::rename(&part, output) {
        remove_quiet(&part);
        return Err(e.into());
    }
    Ok(())
}

fn write_rows(range: &Range<Data>, path: &Path) -> Result<(), ConvertError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in range.rows() {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}
