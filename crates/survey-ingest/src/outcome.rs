//! Ingestion outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::reconcile::DiscrepancyReport;
use crate::rows::{RejectedRow, SheetRow, ValidDatasetRow, ValidQuestionRow};
use crate::schema::SchemaViolation;
use crate::scoring::{InvalidScore, RecordDraft};

/// Why an upload cannot be submitted. Exactly one kind per rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// The bytes are not tabular data.
    ParseError { message: String },
    /// Required form fields were left empty.
    MissingFields { fields: Vec<String> },
    /// Required columns are absent.
    MissingColumns { columns: Vec<String> },
    /// The sheet has no data rows.
    EmptyFile,
    /// Every row was rejected.
    NoValidRows { rejected: Vec<RejectedRow> },
    /// The dataset does not match its question set.
    ReconciliationMismatch(DiscrepancyReport),
    /// An answer is not a whole number, or a strand total overflows.
    InvalidScore(InvalidScore),
    /// The name is already taken.
    NameConflict { name: String, error: String },
    /// The server refused the submission.
    SubmissionError { message: String },
}

impl Rejection {
    /// Wire tag of this rejection.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ParseError { .. } => "parse_error",
            Self::MissingFields { .. } => "missing_fields",
            Self::MissingColumns { .. } => "missing_columns",
            Self::EmptyFile => "empty_file",
            Self::NoValidRows { .. } => "no_valid_rows",
            Self::ReconciliationMismatch(_) => "reconciliation_mismatch",
            Self::InvalidScore(_) => "invalid_score",
            Self::NameConflict { .. } => "name_conflict",
            Self::SubmissionError { .. } => "submission_error",
        }
    }

    /// Discrepancy report, for reconciliation mismatches.
    pub fn discrepancies(&self) -> Option<&DiscrepancyReport> {
        match self {
            Self::ReconciliationMismatch(report) => Some(report),
            _ => None,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError { message } => write!(f, "could not read the file: {message}"),
            Self::MissingFields { fields } => {
                write!(f, "please fill in: {}", fields.join(", "))
            }
            Self::MissingColumns { columns } => {
                write!(f, "missing required column(s): {}", columns.join(", "))
            }
            Self::EmptyFile => f.write_str("the file has no data rows"),
            Self::NoValidRows { rejected } => write!(
                f,
                "no valid rows: all {} row(s) are missing a question or strand",
                rejected.len()
            ),
            Self::ReconciliationMismatch(report) => f.write_str(&report.error),
            Self::InvalidScore(invalid) => write!(f, "{invalid}"),
            Self::NameConflict { error, .. } | Self::SubmissionError { message: error } => {
                f.write_str(error)
            }
        }
    }
}

impl From<IngestError> for Rejection {
    fn from(err: IngestError) -> Self {
        Self::ParseError {
            message: err.to_string(),
        }
    }
}

impl From<SchemaViolation> for Rejection {
    fn from(violation: SchemaViolation) -> Self {
        match violation {
            SchemaViolation::MissingColumns(columns) => Self::MissingColumns { columns },
            SchemaViolation::EmptyFile => Self::EmptyFile,
            SchemaViolation::NoValidRows(rejected) => Self::NoValidRows { rejected },
        }
    }
}

impl From<DiscrepancyReport> for Rejection {
    fn from(report: DiscrepancyReport) -> Self {
        Self::ReconciliationMismatch(report)
    }
}

impl From<InvalidScore> for Rejection {
    fn from(invalid: InvalidScore) -> Self {
        Self::InvalidScore(invalid)
    }
}

/// A validated upload, ready to submit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadyUpload {
    /// Normalized rows in sheet order, skipped rows included.
    pub rows: Vec<SheetRow>,
    /// Per-respondent score preview (dataset uploads only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<RecordDraft>,
}

impl ReadyUpload {
    /// Question rows of a question-set upload.
    pub fn questions(&self) -> impl Iterator<Item = &ValidQuestionRow> {
        self.rows.iter().filter_map(|row| match row {
            SheetRow::Question(question) => Some(question),
            _ => None,
        })
    }

    /// Respondent rows of a dataset upload.
    pub fn dataset_rows(&self) -> impl Iterator<Item = &ValidDatasetRow> {
        self.rows.iter().filter_map(|row| match row {
            SheetRow::Dataset(dataset_row) => Some(dataset_row),
            _ => None,
        })
    }

    /// Rows skipped by validation.
    pub fn rejected_rows(&self) -> impl Iterator<Item = &RejectedRow> {
        self.rows.iter().filter_map(|row| match row {
            SheetRow::Rejected(rejected) => Some(rejected),
            _ => None,
        })
    }

    /// Number of rows that will be submitted.
    pub fn accepted_count(&self) -> usize {
        self.rows.iter().filter(|row| row.is_valid()).count()
    }
}

/// Result of running an upload through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestionOutcome {
    Ready(ReadyUpload),
    Rejected(Rejection),
}

impl IngestionOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The rejection, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Ready(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }

    /// Flattened report for display and serialization.
    pub fn report(&self) -> IngestionReport {
        match self {
            Self::Ready(upload) => IngestionReport {
                accepted: true,
                rows: upload.rows.clone(),
                rejection: None,
            },
            Self::Rejected(rejection) => IngestionReport {
                accepted: false,
                rows: Vec::new(),
                rejection: Some(rejection.clone()),
            },
        }
    }
}

impl From<Rejection> for IngestionOutcome {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

/// Serializable summary of an [`IngestionOutcome`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub accepted: bool,
    pub rows: Vec<SheetRow>,
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_kind_matches_tag() {
        let rejection = Rejection::MissingColumns {
            columns: vec!["Strand".to_string()],
        };
        let json = serde_json::to_value(&rejection).unwrap();
        assert_eq!(json["kind"], rejection.kind());
        assert_eq!(json["columns"][0], "Strand");
    }

    #[test]
    fn test_rejection_display() {
        assert_eq!(
            Rejection::MissingColumns {
                columns: vec!["Questions".to_string(), "Strand".to_string()]
            }
            .to_string(),
            "missing required column(s): Questions, Strand"
        );
        assert_eq!(
            Rejection::NameConflict {
                name: "Batch A".to_string(),
                error: "A dataset with this name already exists.".to_string()
            }
            .to_string(),
            "A dataset with this name already exists."
        );
    }

    #[test]
    fn test_report_of_rejection_is_flattened() {
        let outcome = IngestionOutcome::from(Rejection::EmptyFile);
        let json = serde_json::to_value(outcome.report()).unwrap();
        assert_eq!(json["accepted"], false);
        assert_eq!(json["kind"], "empty_file");
        assert!(json["rows"].as_array().unwrap().is_empty());
    }
}
