//! Workbook (`.xlsx` / `.xls`) reading.

use std::io::Cursor;

use calamine::{Data, Range, Reader, Xls, Xlsx};

use super::FileKind;
use super::grid::Grid;
use crate::error::{IngestError, Result};

fn workbook_error(kind: FileKind, err: impl std::fmt::Display) -> IngestError {
    IngestError::Workbook {
        kind,
        message: err.to_string(),
    }
}

type Source = Cursor<Vec<u8>>;

fn first_range<R>(mut workbook: R, kind: FileKind) -> Result<Range<Data>>
where
    R: Reader<Source>,
    R::Error: std::fmt::Display,
{
    workbook
        .worksheet_range_at(0)
        .ok_or(IngestError::NoWorksheet)?
        .map_err(|e| workbook_error(kind, e))
}

/// Reads the first worksheet of an `.xlsx` workbook into a cell grid.
pub(crate) fn read_xlsx(bytes: &[u8]) -> Result<Grid> {
    let kind = FileKind::Xlsx;
    let workbook: Xlsx<Source> =
        Xlsx::new(Cursor::new(bytes.to_vec())).map_err(|e| workbook_error(kind, e))?;
    Ok(range_to_grid(&first_range(workbook, kind)?))
}

/// Reads the first worksheet of an `.xls` workbook into a cell grid.
pub(crate) fn read_xls(bytes: &[u8]) -> Result<Grid> {
    let kind = FileKind::Xls;
    let workbook: Xls<Source> =
        Xls::new(Cursor::new(bytes.to_vec())).map_err(|e| workbook_error(kind, e))?;
    Ok(range_to_grid(&first_range(workbook, kind)?))
}

fn range_to_grid(range: &Range<Data>) -> Grid {
    // Used ranges may start below row 1 when leading rows are empty.
    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    range
        .rows()
        .enumerate()
        .map(|(idx, cells)| {
            let cells = cells.iter().map(cell_text).collect();
            (first_row + idx + 1, cells)
        })
        .collect()
}

/// Renders a cell as text. Whole numbers lose their fractional part.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(value) => value.clone(),
        Data::Float(value) => format_numeric(*value),
        Data::Int(value) => value.to_string(),
        other => other.to_string(),
    }
}

fn format_numeric(value: f64) -> String {
    if value.is_nan() {
        return String::new();
    }
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return format!("{}", value as i64);
    }
    value.to_string()
}
