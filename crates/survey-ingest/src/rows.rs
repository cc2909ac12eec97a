//! Normalized sheet rows.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use survey_model::Strand;

/// One row of an upload after schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SheetRow {
    /// A question of a question-set upload.
    Question(ValidQuestionRow),
    /// A respondent of a dataset upload.
    Dataset(ValidDatasetRow),
    /// A row skipped by validation.
    Rejected(RejectedRow),
}

impl SheetRow {
    /// 1-based row number in the source sheet.
    pub fn row_number(&self) -> usize {
        match self {
            Self::Question(row) => row.row_number,
            Self::Dataset(row) => row.row_number,
            Self::Rejected(row) => row.row_number,
        }
    }

    /// Returns true unless the row was rejected.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// A question row with both values present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidQuestionRow {
    pub row_number: usize,
    /// Trimmed question text.
    pub question_text: String,
    /// Trimmed strand cell, as written in the sheet.
    pub strand: String,
}

impl ValidQuestionRow {
    /// Strand label, if the cell names one of the three strands.
    pub fn strand_label(&self) -> Option<Strand> {
        Strand::parse(&self.strand)
    }
}

/// A respondent row of a dataset upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidDatasetRow {
    pub row_number: usize,
    /// Trimmed strand cell; empty when the sheet has no strand column.
    pub strand: String,
    /// Answers keyed by question header.
    pub answers: BTreeMap<String, String>,
}

impl ValidDatasetRow {
    /// Strand label, if the cell names one of the three strands.
    pub fn strand_label(&self) -> Option<Strand> {
        Strand::parse(&self.strand)
    }

    /// Row as submitted to the server: answers plus a `Strand` cell, using the
    /// short label when the strand is recognised.
    pub fn wire_cells(&self) -> BTreeMap<String, String> {
        let mut cells = self.answers.clone();
        let strand = self
            .strand_label()
            .map_or_else(|| self.strand.clone(), |s| s.code().to_string());
        cells.insert(crate::STRAND_COLUMN.to_string(), strand);
        cells
    }
}

/// Why a row was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingQuestion,
    MissingStrand,
    MissingQuestionAndStrand,
}

impl RejectReason {
    /// Reason for a question row given which values are empty.
    pub(crate) fn for_question_row(question_empty: bool, strand_empty: bool) -> Option<Self> {
        match (question_empty, strand_empty) {
            (false, false) => None,
            (true, false) => Some(Self::MissingQuestion),
            (false, true) => Some(Self::MissingStrand),
            (true, true) => Some(Self::MissingQuestionAndStrand),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingQuestion => "question text is empty",
            Self::MissingStrand => "strand is empty",
            Self::MissingQuestionAndStrand => "question text and strand are empty",
        })
    }
}

/// A row skipped by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    pub row_number: usize,
    pub reason: RejectReason,
}
