//! Spreadsheet parsing.
//!
//! Turns the bytes of an uploaded `.xlsx`, `.xls` or `.csv` file into a
//! [`ParsedSheet`]: the header row plus every non-blank data row keyed by
//! header. Only the first worksheet of a workbook is read.

mod grid;
mod text;
mod workbook;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

pub use grid::header_key;
pub(crate) use grid::is_placeholder_header;

/// Maximum accepted upload size (50 MB).
pub const MAX_UPLOAD_SIZE: u64 = 50 * 1024 * 1024;

// =============================================================================
// FILE KIND
// =============================================================================

/// Declared kind of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Office Open XML workbook.
    Xlsx,
    /// Legacy BIFF workbook.
    Xls,
    /// Comma separated text.
    Csv,
}

impl FileKind {
    /// All accepted kinds.
    pub const ALL: [FileKind; 3] = [Self::Xlsx, Self::Xls, Self::Csv];

    /// Extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Csv => "csv",
        }
    }

    /// Resolves a kind from an extension (case-insensitive, dot optional).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim().trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|kind| kind.extension().eq_ignore_ascii_case(ext))
    }

    /// Resolves a kind from a file name or path.
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| IngestError::UnsupportedFileKind {
                name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.extension())
    }
}

// =============================================================================
// PARSED SHEET
// =============================================================================

/// A data row keyed by header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based row number in the source sheet.
    pub row_number: usize,
    /// Cell values keyed by header; missing cells are empty strings.
    pub cells: BTreeMap<String, String>,
}

impl RawRow {
    /// Value under `header`, or an empty string.
    pub fn get(&self, header: &str) -> &str {
        self.cells.get(header).map(String::as_str).unwrap_or_default()
    }
}

/// Result of parsing an uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSheet {
    /// Header names in column order (trimmed, de-duplicated).
    pub headers: Vec<String>,
    /// Data rows in sheet order, blank rows skipped.
    pub rows: Vec<RawRow>,
}

impl ParsedSheet {
    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the sheet has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finds the header matching `wanted` ignoring case and whitespace.
    pub fn find_header(&self, wanted: &str) -> Option<&str> {
        let key = header_key(wanted);
        self.headers
            .iter()
            .find(|header| header_key(header) == key)
            .map(String::as_str)
    }
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Parses uploaded bytes as the declared file kind.
///
/// A sheet with a header but no data rows (or no rows at all) is a valid,
/// empty result. Fails only when the bytes cannot be decoded as tabular data.
pub fn parse_sheet(bytes: &[u8], kind: FileKind) -> Result<ParsedSheet> {
    let size = bytes.len() as u64;
    if size > MAX_UPLOAD_SIZE {
        return Err(IngestError::FileTooLarge {
            size,
            max_size: MAX_UPLOAD_SIZE,
        });
    }

    let grid = match kind {
        FileKind::Csv => text::read_csv_grid(bytes)?,
        FileKind::Xlsx => workbook::read_xlsx(bytes)?,
        FileKind::Xls => workbook::read_xls(bytes)?,
    };
    let sheet = grid::assemble(grid);

    tracing::debug!(
        kind = %kind,
        columns = sheet.headers.len(),
        rows = sheet.rows.len(),
        "parsed sheet"
    );
    Ok(sheet)
}

/// Reads and parses a sheet from disk, taking the kind from the extension.
pub fn read_sheet_file(path: &Path) -> Result<ParsedSheet> {
    let kind = FileKind::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_sheet(&bytes, kind)
}
