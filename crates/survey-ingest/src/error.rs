//! Error types for spreadsheet parsing.
//!
//! Everything here is a parse-level failure: the bytes could not be read as
//! tabular data at all. Business-level problems (missing columns, unmatched
//! questions) are reported through [`crate::Rejection`] instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::sheet::FileKind;

/// Errors that can occur while turning an uploaded file into rows.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File Errors ===
    /// The file name does not carry a supported extension.
    #[error("unsupported file type '{name}': expected .xlsx, .xls or .csv")]
    UnsupportedFileKind { name: String },

    /// Failed to read the file from disk.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exceeds the upload limit.
    #[error("file is too large: {size} bytes (limit {max_size} bytes)")]
    FileTooLarge { size: u64, max_size: u64 },

    // === Workbook Errors ===
    /// The workbook container could not be decoded.
    #[error("could not read {kind} workbook: {message}")]
    Workbook { kind: FileKind, message: String },

    /// The workbook contains no worksheet.
    #[error("workbook has no worksheets")]
    NoWorksheet,

    // === Text Errors ===
    /// The text is not in a supported encoding.
    #[error("unsupported text encoding: {encoding}")]
    UnsupportedEncoding { encoding: String },

    /// The file carries binary content where text was expected.
    #[error("file contains binary data and cannot be read as CSV")]
    BinaryContent,

    /// A CSV record could not be parsed.
    #[error("failed to parse CSV near line {line}: {message}")]
    Csv { line: u64, message: String },
}

impl IngestError {
    /// Returns a user-friendly message suitable for display.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::UnsupportedFileKind { .. } => "Please upload an .xlsx, .xls or .csv file.",
            Self::FileRead { .. } => "The file could not be opened.",
            Self::FileTooLarge { .. } => "The file is too large to import.",
            Self::Workbook { .. } | Self::NoWorksheet => {
                "The spreadsheet is damaged or not a valid workbook."
            }
            Self::UnsupportedEncoding { .. } | Self::BinaryContent | Self::Csv { .. } => {
                "The file could not be read as a text spreadsheet."
            }
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
