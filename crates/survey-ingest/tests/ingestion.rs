//! Integration tests for the ingestion pipeline.

use std::path::PathBuf;

use survey_ingest::{
    DiscrepancyReport, FileKind, IngestionOutcome, MatchPolicy, ReferenceQuestions, Rejection,
    SheetRow, check_dataset_sheet, ingest_dataset, ingest_question_set, parse_sheet,
    read_sheet_file, reconcile, validate_dataset_sheet,
};

fn csv(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

fn reference() -> ReferenceQuestions {
    ReferenceQuestions::from_texts(["Enjoys solving equations", "Enjoys bookkeeping", "Enjoys reading history"])
}

// =============================================================================
// Question sets
// =============================================================================

#[test]
fn test_missing_columns_for_every_header_variant() {
    let variants = [
        "Question,Strand",
        "Questions,Strands",
        " Questions ,",
        "QUESTION TEXT,STRAND",
        "Strand",
    ];
    for header in variants {
        let outcome = ingest_question_set(&csv(&format!("{header}\nQ1,STEM\n")), FileKind::Csv);
        assert!(
            matches!(
                outcome,
                IngestionOutcome::Rejected(Rejection::MissingColumns { ref columns }) if !columns.is_empty()
            ),
            "header {header:?} gave {outcome:?}"
        );
    }
}

#[test]
fn test_header_case_and_whitespace_are_ignored() {
    for header in ["questions,strand", "  QUESTIONS  ,  Strand ", "Questions,STRAND"] {
        let outcome = ingest_question_set(&csv(&format!("{header}\nQ1,STEM\n")), FileKind::Csv);
        assert!(outcome.is_ready(), "header {header:?} gave {outcome:?}");
    }
}

#[test]
fn test_missing_columns_names_each_absent_column() {
    let outcome = ingest_question_set(&csv("Prompt,Track\nQ1,STEM\n"), FileKind::Csv);
    assert_eq!(
        outcome.rejection(),
        Some(&Rejection::MissingColumns {
            columns: vec!["Questions".to_string(), "Strand".to_string()]
        })
    );
}

#[test]
fn test_no_valid_rows() {
    let outcome = ingest_question_set(&csv("Questions,Strand\nQ1,\n  ,ABM\n"), FileKind::Csv);
    let Some(Rejection::NoValidRows { rejected }) = outcome.rejection() else {
        panic!("expected NoValidRows, got {outcome:?}");
    };
    assert_eq!(rejected.len(), 2);
    assert_eq!(rejected[0].row_number, 2);
}

#[test]
fn test_two_row_round_trip_is_trimmed_and_ordered() {
    let outcome = ingest_question_set(
        &csv("Questions,Strand\n  Enjoys algebra  , STEM \nEnjoys debate,HUMSS\n"),
        FileKind::Csv,
    );
    let IngestionOutcome::Ready(upload) = outcome else {
        panic!("expected a ready upload");
    };
    let questions: Vec<(&str, &str)> = upload
        .questions()
        .map(|q| (q.question_text.as_str(), q.strand.as_str()))
        .collect();
    assert_eq!(
        questions,
        vec![("Enjoys algebra", "STEM"), ("Enjoys debate", "HUMSS")]
    );
    assert_eq!(upload.accepted_count(), 2);
}

#[test]
fn test_blank_rows_before_header_are_skipped() {
    let outcome = ingest_question_set(&csv(",\n,\nQuestions,Strand\nQ1,ABM\n"), FileKind::Csv);
    let IngestionOutcome::Ready(upload) = outcome else {
        panic!("expected a ready upload");
    };
    assert_eq!(upload.rows.len(), 1);
    assert!(matches!(&upload.rows[0], SheetRow::Question(q) if q.row_number == 4));
}

#[test]
fn test_corrupt_workbook_is_parse_error() {
    let outcome = ingest_question_set(b"not really a workbook", FileKind::Xlsx);
    assert_eq!(outcome.rejection().map(Rejection::kind), Some("parse_error"));
}

// =============================================================================
// Datasets
// =============================================================================

#[test]
fn test_xlsx_workbook_headers_and_rows() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/responses.xlsx");
    let sheet = read_sheet_file(&path).unwrap();
    assert_eq!(
        sheet.headers,
        vec![
            "Enjoys solving equations",
            "Enjoys bookkeeping",
            "Enjoys reading history",
            "Strand"
        ]
    );
    assert_eq!(sheet.len(), 2);
    assert_eq!(sheet.rows[0].row_number, 2);
    assert_eq!(sheet.rows[0].get("Enjoys solving equations"), "5");
    assert_eq!(sheet.rows[1].get("Enjoys reading history"), "4");
    assert_eq!(sheet.rows[1].get("Strand"), "Humanities and Social Sciences");

    let IngestionOutcome::Ready(upload) =
        check_dataset_sheet(&sheet, &reference(), MatchPolicy::Strict)
    else {
        panic!("expected the workbook to reconcile");
    };
    assert_eq!(upload.records.len(), 2);
}

#[test]
fn test_dataset_without_rows_is_empty_file() {
    let outcome = ingest_dataset(&csv(""), FileKind::Csv, &reference(), MatchPolicy::Strict);
    assert_eq!(outcome.rejection(), Some(&Rejection::EmptyFile));
}

#[test]
fn test_matching_dataset_is_ready() {
    let outcome = ingest_dataset(
        &csv(
            "enjoys solving equations,ENJOYS BOOKKEEPING,Enjoys reading history,Strand\n\
             5,1,2,STEM\n\
             1,4,2,Accountancy and Business Management\n",
        ),
        FileKind::Csv,
        &reference(),
        MatchPolicy::Strict,
    );
    let IngestionOutcome::Ready(upload) = outcome else {
        panic!("expected a ready upload, got {outcome:?}");
    };
    assert_eq!(upload.dataset_rows().count(), 2);
    assert_eq!(upload.records.len(), 2);
}

#[test]
fn test_mismatch_carries_all_three_lists() {
    let outcome = ingest_dataset(
        &csv(
            "Enjoys solving equations,Enjoys painting,Strand\n\
             5,1,STEM\n\
             1,4,\n\
             2,2,Arts\n",
        ),
        FileKind::Csv,
        &reference(),
        MatchPolicy::Strict,
    );
    let Some(Rejection::ReconciliationMismatch(report)) = outcome.rejection() else {
        panic!("expected a reconciliation mismatch, got {outcome:?}");
    };
    assert_eq!(
        report.missing_questions,
        vec!["Enjoys bookkeeping", "Enjoys reading history"]
    );
    assert_eq!(report.extra_questions, vec!["Enjoys painting"]);
    assert_eq!(report.missing_strand_rows, vec![3, 4]);
}

#[test]
fn test_same_question_in_two_columns_is_rejected() {
    let outcome = ingest_dataset(
        &csv(
            "Enjoys solving equations,ENJOYS SOLVING EQUATIONS,Enjoys bookkeeping,\
             Enjoys reading history,Strand\n\
             3,4,1,2,STEM\n",
        ),
        FileKind::Csv,
        &reference(),
        MatchPolicy::Strict,
    );
    let Some(Rejection::ReconciliationMismatch(report)) = outcome.rejection() else {
        panic!("expected a reconciliation mismatch, got {outcome:?}");
    };
    assert!(report.missing_questions.is_empty());
    assert_eq!(report.extra_questions, vec!["ENJOYS SOLVING EQUATIONS"]);
}

#[test]
fn test_overflowing_scores_are_rejected() {
    let reference = ReferenceQuestions::from_rows(&[
        survey_ingest::ValidQuestionRow {
            row_number: 2,
            question_text: "A".to_string(),
            strand: "STEM".to_string(),
        },
        survey_ingest::ValidQuestionRow {
            row_number: 3,
            question_text: "B".to_string(),
            strand: "STEM".to_string(),
        },
    ]);
    let outcome = ingest_dataset(
        &csv("A,B,Strand\n9223372036854775807,1,STEM\n"),
        FileKind::Csv,
        &reference,
        MatchPolicy::Strict,
    );
    let Some(Rejection::InvalidScore(invalid)) = outcome.rejection() else {
        panic!("expected an invalid score, got {outcome:?}");
    };
    assert_eq!(invalid.row, 2);
    assert_eq!(invalid.question, "B");
}

#[test]
fn test_missing_strand_column_flags_every_row() {
    let outcome = ingest_dataset(
        &csv("Enjoys solving equations,Enjoys bookkeeping,Enjoys reading history\n1,2,3\n4,5,6\n"),
        FileKind::Csv,
        &reference(),
        MatchPolicy::Strict,
    );
    let report = outcome.rejection().and_then(Rejection::discrepancies).unwrap();
    assert!(report.missing_questions.is_empty());
    assert!(report.extra_questions.is_empty());
    assert_eq!(report.missing_strand_rows, vec![2, 3]);
}

#[test]
fn test_discrepancy_report_wire_shape() {
    let sheet = parse_sheet(
        &csv("Enjoys solving equations,Enjoys painting,Strand\n1,2,\n"),
        FileKind::Csv,
    )
    .unwrap();
    let dataset = validate_dataset_sheet(&sheet).unwrap();
    let report = reconcile(&dataset, &reference(), MatchPolicy::Strict);

    insta::assert_json_snapshot!(report, @r#"
    {
      "missing_questions": [
        "Enjoys bookkeeping",
        "Enjoys reading history"
      ],
      "extra_questions": [
        "Enjoys painting"
      ],
      "missing_strand_rows": [
        2
      ],
      "error": "Import failed: 2 question(s) missing from the file; 1 question(s) not in the question set; 1 row(s) without a valid strand."
    }
    "#);
}

#[test]
fn test_reconciliation_is_idempotent() {
    let sheet = parse_sheet(
        &csv("Enjoys bookkeeping,Extra question,Strand\n1,2,ABM\n3,4,\n"),
        FileKind::Csv,
    )
    .unwrap();
    let dataset = validate_dataset_sheet(&sheet).unwrap();
    let first = reconcile(&dataset, &reference(), MatchPolicy::Strict);
    let second = reconcile(&dataset, &reference(), MatchPolicy::Strict);
    assert_eq!(first, second);

    let outcome = check_dataset_sheet(&sheet, &reference(), MatchPolicy::Strict);
    assert_eq!(outcome, check_dataset_sheet(&sheet, &reference(), MatchPolicy::Strict));
}

#[test]
fn test_reconciliation_is_complete() {
    let sheet = parse_sheet(
        &csv("ENJOYS BOOKKEEPING,Extra one,Extra two,Strand\n1,2,3,HUMSS\n"),
        FileKind::Csv,
    )
    .unwrap();
    let dataset = validate_dataset_sheet(&sheet).unwrap();
    let reference = reference();
    let report = reconcile(&dataset, &reference, MatchPolicy::Strict);

    let key = |text: &str| MatchPolicy::Strict.key(text);
    let uploaded: Vec<String> = dataset.question_columns.iter().map(|c| key(c.as_str())).collect();
    let known: Vec<String> = reference.texts().map(key).collect();

    // Every reference question is either uploaded or reported missing.
    for text in reference.texts() {
        assert_ne!(
            uploaded.contains(&key(text)),
            report.missing_questions.iter().any(|m| m == text),
        );
    }
    // Every uploaded question is either known or reported extra.
    for column in &dataset.question_columns {
        assert_ne!(
            known.contains(&key(column.as_str())),
            report.extra_questions.contains(column),
        );
    }
}

#[test]
fn test_lenient_policy_is_opt_in() {
    let reference = ReferenceQuestions::from_texts(["Research  & development"]);
    let bytes = csv("research and development,Strand\n3,STEM\n");
    assert!(!ingest_dataset(&bytes, FileKind::Csv, &reference, MatchPolicy::default()).is_ready());
    assert!(ingest_dataset(&bytes, FileKind::Csv, &reference, MatchPolicy::Lenient).is_ready());
}

#[test]
fn test_server_and_client_reports_share_a_type() {
    let server: DiscrepancyReport = serde_json::from_value(serde_json::json!({
        "error": "Import failed due to missing questions or Strand values.",
        "missing_questions": ["enjoys bookkeeping"],
    }))
    .unwrap();
    let rejection = Rejection::from(server);
    assert_eq!(rejection.kind(), "reconciliation_mismatch");
    assert_eq!(
        rejection.to_string(),
        "Import failed due to missing questions or Strand values."
    );
}
