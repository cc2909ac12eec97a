//! Column contracts for question-set and dataset uploads.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rows::{RejectReason, RejectedRow, SheetRow, ValidDatasetRow, ValidQuestionRow};
use crate::sheet::{ParsedSheet, header_key, is_placeholder_header};

/// Question text column of a question-set upload.
pub const QUESTIONS_COLUMN: &str = "Questions";

/// Strand column of both upload kinds.
pub const STRAND_COLUMN: &str = "Strand";

/// Survey question that doubles as the strand column of a dataset export.
pub const STRAND_ALIGNMENT_HEADER: &str =
    "Is your Senior High School strand aligned with your current course/program?";

/// A sheet that fails its column contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaViolation {
    /// Required columns are absent.
    MissingColumns(Vec<String>),
    /// The sheet has no data rows.
    EmptyFile,
    /// Every data row was rejected.
    NoValidRows(Vec<RejectedRow>),
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingColumns(columns) => {
                write!(f, "missing required column(s): {}", columns.join(", "))
            }
            Self::EmptyFile => f.write_str("the file has no data rows"),
            Self::NoValidRows(rejected) => {
                write!(f, "none of the {} row(s) is valid", rejected.len())
            }
        }
    }
}

// =============================================================================
// QUESTION SETS
// =============================================================================

/// A question-set upload that satisfies the column contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSheet {
    /// Surviving rows, trimmed, in sheet order.
    pub questions: Vec<ValidQuestionRow>,
    /// Rows skipped because a value is empty.
    pub rejected: Vec<RejectedRow>,
}

impl QuestionSheet {
    /// All rows in sheet order.
    pub fn rows(&self) -> Vec<SheetRow> {
        let mut rows: Vec<SheetRow> = self
            .questions
            .iter()
            .cloned()
            .map(SheetRow::Question)
            .chain(self.rejected.iter().cloned().map(SheetRow::Rejected))
            .collect();
        rows.sort_by_key(SheetRow::row_number);
        rows
    }
}

/// Validates a question-set upload.
///
/// The sheet needs `Questions` and `Strand` columns (matched ignoring case and
/// surrounding whitespace). Rows where either value is empty are rejected.
pub fn validate_question_sheet(sheet: &ParsedSheet) -> Result<QuestionSheet, SchemaViolation> {
    let question_col = sheet.find_header(QUESTIONS_COLUMN);
    let strand_col = sheet.find_header(STRAND_COLUMN);

    let (Some(question_col), Some(strand_col)) = (question_col, strand_col) else {
        let columns = [
            (question_col, QUESTIONS_COLUMN),
            (strand_col, STRAND_COLUMN),
        ]
        .into_iter()
        .filter(|(found, _)| found.is_none())
        .map(|(_, name)| name.to_string())
        .collect();
        return Err(SchemaViolation::MissingColumns(columns));
    };

    let mut questions = Vec::new();
    let mut rejected = Vec::new();
    for row in &sheet.rows {
        let question_text = row.get(question_col).trim();
        let strand = row.get(strand_col).trim();
        match RejectReason::for_question_row(question_text.is_empty(), strand.is_empty()) {
            None => questions.push(ValidQuestionRow {
                row_number: row.row_number,
                question_text: question_text.to_string(),
                strand: strand.to_string(),
            }),
            Some(reason) => rejected.push(RejectedRow {
                row_number: row.row_number,
                reason,
            }),
        }
    }

    if questions.is_empty() {
        return Err(SchemaViolation::NoValidRows(rejected));
    }
    if !rejected.is_empty() {
        tracing::warn!(rejected = rejected.len(), "skipped incomplete question rows");
    }
    Ok(QuestionSheet {
        questions,
        rejected,
    })
}

// =============================================================================
// DATASETS
// =============================================================================

/// A dataset upload in wide layout: one column per question, one row per
/// respondent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSheet {
    /// Header of the strand column, if present.
    pub strand_column: Option<String>,
    /// Question headers in column order.
    pub question_columns: Vec<String>,
    /// Respondent rows in sheet order.
    pub rows: Vec<ValidDatasetRow>,
}

impl DatasetSheet {
    /// Respondent rows wrapped as [`SheetRow`]s.
    pub fn sheet_rows(&self) -> Vec<SheetRow> {
        self.rows.iter().cloned().map(SheetRow::Dataset).collect()
    }
}

fn find_strand_column(sheet: &ParsedSheet) -> Option<&str> {
    sheet
        .find_header(STRAND_COLUMN)
        .or_else(|| sheet.find_header(STRAND_ALIGNMENT_HEADER))
}

/// Validates a dataset upload.
///
/// There is no fixed column contract: every header other than the strand
/// column is an uploaded question. Strand values are checked during
/// reconciliation, not here.
pub fn validate_dataset_sheet(sheet: &ParsedSheet) -> Result<DatasetSheet, SchemaViolation> {
    if sheet.is_empty() {
        return Err(SchemaViolation::EmptyFile);
    }

    let strand_column = find_strand_column(sheet).map(str::to_string);
    let strand_key = strand_column.as_deref().map(header_key);
    let question_columns: Vec<String> = sheet
        .headers
        .iter()
        .filter(|header| Some(header_key(header)) != strand_key)
        .filter(|header| !is_placeholder_header(header))
        .cloned()
        .collect();

    let rows = sheet
        .rows
        .iter()
        .map(|row| ValidDatasetRow {
            row_number: row.row_number,
            strand: strand_column
                .as_deref()
                .map(|col| row.get(col).trim().to_string())
                .unwrap_or_default(),
            answers: question_columns
                .iter()
                .map(|col| (col.clone(), row.get(col).trim().to_string()))
                .collect(),
        })
        .collect();

    Ok(DatasetSheet {
        strand_column,
        question_columns,
        rows,
    })
}
