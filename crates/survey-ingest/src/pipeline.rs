//! End-to-end ingestion: parse, validate, reconcile.
//!
//! Every function here returns an [`IngestionOutcome`]; parse errors, schema
//! violations and reconciliation mismatches all become [`Rejection`]s.

use crate::outcome::{IngestionOutcome, ReadyUpload, Rejection};
use crate::reconcile::{MatchPolicy, ReferenceQuestions, reconcile};
use crate::schema::{validate_dataset_sheet, validate_question_sheet};
use crate::scoring::score_rows;
use crate::sheet::{FileKind, ParsedSheet, parse_sheet};

/// Validates an already parsed question-set sheet.
pub fn check_question_sheet(sheet: &ParsedSheet) -> IngestionOutcome {
    match validate_question_sheet(sheet) {
        Ok(questions) => {
            tracing::info!(
                questions = questions.questions.len(),
                skipped = questions.rejected.len(),
                "question set upload accepted"
            );
            IngestionOutcome::Ready(ReadyUpload {
                rows: questions.rows(),
                records: Vec::new(),
            })
        }
        Err(violation) => {
            tracing::info!(%violation, "question set upload rejected");
            Rejection::from(violation).into()
        }
    }
}

/// Validates and reconciles an already parsed dataset sheet.
pub fn check_dataset_sheet(
    sheet: &ParsedSheet,
    reference: &ReferenceQuestions,
    policy: MatchPolicy,
) -> IngestionOutcome {
    let dataset = match validate_dataset_sheet(sheet) {
        Ok(dataset) => dataset,
        Err(violation) => {
            tracing::info!(%violation, "dataset upload rejected");
            return Rejection::from(violation).into();
        }
    };

    let report = reconcile(&dataset, reference, policy);
    if !report.is_clean() {
        tracing::info!(error = %report.error, "dataset does not match its question set");
        return Rejection::from(report).into();
    }

    match score_rows(&dataset, reference, policy) {
        Ok(records) => {
            tracing::info!(
                respondents = dataset.rows.len(),
                questions = dataset.question_columns.len(),
                "dataset upload accepted"
            );
            IngestionOutcome::Ready(ReadyUpload {
                rows: dataset.sheet_rows(),
                records,
            })
        }
        Err(invalid) => {
            tracing::info!(row = invalid.row, question = %invalid.question, "invalid score");
            Rejection::from(invalid).into()
        }
    }
}

/// Runs a question-set upload through parsing and validation.
pub fn ingest_question_set(bytes: &[u8], kind: FileKind) -> IngestionOutcome {
    match parse_sheet(bytes, kind) {
        Ok(sheet) => check_question_sheet(&sheet),
        Err(err) => {
            tracing::info!(error = %err, "question set upload could not be parsed");
            Rejection::from(err).into()
        }
    }
}

/// Runs a dataset upload through parsing, validation and reconciliation
/// against `reference`.
pub fn ingest_dataset(
    bytes: &[u8],
    kind: FileKind,
    reference: &ReferenceQuestions,
    policy: MatchPolicy,
) -> IngestionOutcome {
    match parse_sheet(bytes, kind) {
        Ok(sheet) => check_dataset_sheet(&sheet, reference, policy),
        Err(err) => {
            tracing::info!(error = %err, "dataset upload could not be parsed");
            Rejection::from(err).into()
        }
    }
}
