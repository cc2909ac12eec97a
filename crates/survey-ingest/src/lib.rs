//! Spreadsheet ingestion for question sets and datasets.
//!
//! An uploaded file flows through three stages:
//!
//! 1. **Parsing** ([`parse_sheet`]): `.xlsx`, `.xls` or `.csv` bytes become an
//!    ordered list of rows keyed by header.
//! 2. **Schema validation** ([`validate_question_sheet`],
//!    [`validate_dataset_sheet`]): column contracts and row-level checks.
//! 3. **Reconciliation** ([`reconcile`]): dataset uploads are compared against
//!    the questions of their reference question set.
//!
//! The [`pipeline`] functions chain the stages and always return an
//! [`IngestionOutcome`]; no ingestion failure escapes as an error.
//!
//! # Example
//!
//! ```ignore
//! use survey_ingest::{FileKind, IngestionOutcome, ingest_question_set};
//!
//! let bytes = std::fs::read("questions.xlsx")?;
//! match ingest_question_set(&bytes, FileKind::Xlsx) {
//!     IngestionOutcome::Ready(upload) => println!("{} questions", upload.rows.len()),
//!     IngestionOutcome::Rejected(rejection) => eprintln!("{rejection}"),
//! }
//! ```

mod error;
mod outcome;
pub mod pipeline;
mod reconcile;
mod rows;
mod schema;
mod scoring;
mod sheet;

// === Error Types ===
pub use error::{IngestError, Result};

// === Parsing ===
pub use sheet::{
    FileKind, MAX_UPLOAD_SIZE, ParsedSheet, RawRow, header_key, parse_sheet, read_sheet_file,
};

// === Rows ===
pub use rows::{RejectReason, RejectedRow, SheetRow, ValidDatasetRow, ValidQuestionRow};

// === Schema Validation ===
pub use schema::{
    DatasetSheet, QUESTIONS_COLUMN, QuestionSheet, STRAND_ALIGNMENT_HEADER, STRAND_COLUMN,
    SchemaViolation, validate_dataset_sheet, validate_question_sheet,
};

// === Reconciliation ===
pub use reconcile::{DiscrepancyReport, MatchPolicy, ReferenceQuestions, reconcile};

// === Scoring ===
pub use scoring::{InvalidScore, RecordDraft, score_rows};

// === Outcome ===
pub use outcome::{IngestionOutcome, IngestionReport, ReadyUpload, Rejection};
pub use pipeline::{check_dataset_sheet, check_question_sheet, ingest_dataset, ingest_question_set};
