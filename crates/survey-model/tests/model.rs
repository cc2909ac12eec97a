//! Integration tests for the wire model.

use survey_model::{
    AssessmentResult, Dataset, DatasetId, DatasetStatus, Question, QuestionSet, QuestionSetId,
    Record, Strand,
};

#[test]
fn test_dataset_collection_from_server() {
    let json = r#"[
        {"data_set_id": 1, "data_set_name": "Pilot", "data_set_description": null,
         "question_set_id": 3, "status": "Inactive", "created_at": null, "rows": 40},
        {"data_set_id": 2, "data_set_name": "2025 intake", "data_set_description": "Main",
         "question_set_id": 3, "status": "Active", "created_at": "2025-03-01T08:30:00",
         "rows": 120, "best_k": 7, "accuracy": 0.91}
    ]"#;
    let datasets: Vec<Dataset> = serde_json::from_str(json).unwrap();
    assert_eq!(datasets.len(), 2);
    assert_eq!(datasets.iter().filter(|d| d.is_active()).count(), 1);
    assert_eq!(datasets[0].description_text(), "");
    assert_eq!(datasets[1].id, DatasetId(2));
    assert_eq!(datasets[1].status, DatasetStatus::Active);
    assert_eq!(datasets[1].row_count, 120);
}

#[test]
fn test_dataset_wire_names_survive_round_trip() {
    let json = r#"{"data_set_id": 4, "data_set_name": "Batch", "question_set_id": 1}"#;
    let dataset: Dataset = serde_json::from_str(json).unwrap();
    assert_eq!(dataset.status, DatasetStatus::Inactive);

    let value = serde_json::to_value(&dataset).unwrap();
    assert_eq!(value["data_set_id"], 4);
    assert_eq!(value["data_set_name"], "Batch");
    assert_eq!(value["status"], "Inactive");
    assert_eq!(value["rows"], 0);
}

#[test]
fn test_question_set_and_questions() {
    let set: QuestionSet = serde_json::from_str(
        r#"{"question_set_id": 3, "question_set_name": "Strand survey",
            "description": "Grade 10", "created_at": "Sat, 01 Mar 2025 08:30:00 GMT",
            "questions_count": 30}"#,
    )
    .unwrap();
    assert_eq!(set.id, QuestionSetId(3));
    assert_eq!(set.question_count, 30);
    assert!(set.created_at.is_some());

    let questions: Vec<Question> = serde_json::from_str(
        r#"[{"question_id": 1, "question_text": "Enjoys algebra", "strand": "STEM"},
            {"question_id": 2, "question_text": "Enjoys debate", "strand": "humss"}]"#,
    )
    .unwrap();
    let strands: Vec<Option<Strand>> = questions.iter().map(Question::strand_label).collect();
    assert_eq!(strands, vec![Some(Strand::Stem), Some(Strand::Humss)]);
}

#[test]
fn test_record_scores_by_strand() {
    let record: Record = serde_json::from_str(
        r#"{"data_id": 8, "data_set_id": 2, "strand": "ABM",
            "stem_score": 4, "abm_score": 9, "humss_score": 1}"#,
    )
    .unwrap();
    assert_eq!(record.strand_label(), Some(Strand::Abm));
    let total: f64 = Strand::ALL.iter().map(|s| record.score(*s)).sum();
    assert_eq!(total, 14.0);
}

#[test]
fn test_minimal_result() {
    let result: AssessmentResult =
        serde_json::from_str(r#"{"results_id": 5, "recommended_strand": "STEM"}"#).unwrap();
    assert!(!result.tie);
    assert_eq!(result.dataset_name(), None);
    assert_eq!(result.strand_label(), Some(Strand::Stem));
}
