//! Integration tests for the dashboard driver against the in-memory backend.

use std::sync::Arc;

use chrono::Duration;
use survey_ingest::{IngestionOutcome, MatchPolicy, Rejection};
use survey_model::{DatasetStatus, QuestionSetId, Strand};
use survey_state::{
    Activation, Credentials, Dashboard, DatasetForm, DistributionMode, GateKey, MemoryBackend,
    QuestionSetForm, Selection, Session, StateError, Upload, session,
};

const QUESTIONS: [(&str, Strand); 3] = [
    ("Enjoys solving equations", Strand::Stem),
    ("Enjoys bookkeeping", Strand::Abm),
    ("Enjoys reading history", Strand::Humss),
];

fn seeded() -> (Arc<MemoryBackend>, QuestionSetId) {
    let backend = MemoryBackend::new();
    let set = backend.add_question_set("Interests", &QUESTIONS);
    (Arc::new(backend), set)
}

async fn wait_for_call(backend: &MemoryBackend, operation: &str, count: usize) {
    while backend.calls(operation) < count {
        tokio::task::yield_now().await;
    }
}

fn dataset_csv() -> Upload {
    Upload::new(
        "responses.csv",
        b"Strand,Enjoys solving equations,Enjoys bookkeeping,Enjoys reading history\n\
          STEM,5,1,2\n\
          ABM,1,5,2\n"
            .to_vec(),
    )
}

// =============================================================================
// Selection
// =============================================================================

#[tokio::test]
async fn test_stale_questions_response_is_dropped() {
    let (backend, first) = seeded();
    let second = backend.add_question_set("Values", &[("Likes debate", Strand::Humss)]);
    let dashboard = Arc::new(Dashboard::new(Arc::clone(&backend)));
    dashboard.load().await.unwrap();

    let gate = backend.hold(GateKey::Questions(first));
    let slow = tokio::spawn({
        let dashboard = Arc::clone(&dashboard);
        async move { dashboard.select_set(first).await }
    });
    wait_for_call(&backend, "questions", 1).await;

    assert!(dashboard.select_set(second).await.unwrap());
    gate.open();
    assert!(!slow.await.unwrap().unwrap());

    let state = dashboard.snapshot();
    assert_eq!(state.selection(), Selection::SetSelected(second));
    assert_eq!(state.questions().len(), 1);
    assert_eq!(state.questions()[0].text, "Likes debate");
}

#[tokio::test]
async fn test_deselect_drops_in_flight_records() {
    let (backend, set) = seeded();
    let dataset = backend.add_dataset("Batch 1", set, &[(Strand::Stem, [9.0, 1.0, 2.0])]);
    let dashboard = Arc::new(Dashboard::new(Arc::clone(&backend)));
    dashboard.load().await.unwrap();
    dashboard.select_set(set).await.unwrap();

    let gate = backend.hold(GateKey::Records(dataset));
    let slow = tokio::spawn({
        let dashboard = Arc::clone(&dashboard);
        async move { dashboard.select_dataset(dataset).await }
    });
    wait_for_call(&backend, "records", 1).await;
    dashboard.deselect_dataset();
    gate.open();

    assert!(!slow.await.unwrap().unwrap());
    let state = dashboard.snapshot();
    assert_eq!(state.selection(), Selection::SetSelected(set));
    assert!(state.records().is_empty());
}

#[tokio::test]
async fn test_dataset_of_other_set_is_not_selectable() {
    let (backend, set) = seeded();
    let other = backend.add_question_set("Values", &[("Likes debate", Strand::Humss)]);
    let foreign = backend.add_dataset("Other batch", other, &[]);
    let dashboard = Dashboard::new(Arc::clone(&backend));
    dashboard.load().await.unwrap();
    dashboard.select_set(set).await.unwrap();

    assert_eq!(
        dashboard.select_dataset(foreign).await,
        Err(StateError::DatasetNotSelectable(foreign))
    );
    assert_eq!(dashboard.snapshot().selection(), Selection::SetSelected(set));
    assert_eq!(backend.calls("records"), 0);
}

#[tokio::test]
async fn test_distribution_follows_selection() {
    let (backend, set) = seeded();
    let dataset = backend.add_dataset(
        "Batch 1",
        set,
        &[
            (Strand::Stem, [9.0, 1.0, 2.0]),
            (Strand::Stem, [8.0, 2.0, 1.0]),
            (Strand::Abm, [1.0, 7.0, 3.0]),
        ],
    );
    let dashboard = Dashboard::new(Arc::clone(&backend));
    dashboard.load().await.unwrap();
    dashboard.select_set(set).await.unwrap();

    let by_question = dashboard
        .with_state(|state| state.distribution(DistributionMode::Count))
        .unwrap();
    assert_eq!(by_question.total(), 3.0);

    dashboard.select_dataset(dataset).await.unwrap();
    let counts = dashboard
        .with_state(|state| state.distribution(DistributionMode::Count))
        .unwrap();
    assert_eq!(counts.get(Strand::Stem), 2.0);
    assert_eq!(counts.get(Strand::Abm), 1.0);
    assert_eq!(counts.get(Strand::Humss), 0.0);

    let scores = dashboard
        .with_state(|state| state.distribution(DistributionMode::Score))
        .unwrap();
    assert_eq!(scores.get(Strand::Stem), 18.0);
    assert_eq!(scores.get(Strand::Abm), 10.0);
}

// =============================================================================
// Refresh ordering
// =============================================================================

#[tokio::test]
async fn test_older_refresh_never_overwrites_newer() {
    let (backend, set) = seeded();
    let dashboard = Arc::new(Dashboard::new(Arc::clone(&backend)));

    let gate = backend.hold(GateKey::Datasets);
    let older = tokio::spawn({
        let dashboard = Arc::clone(&dashboard);
        async move { dashboard.refresh_datasets().await }
    });
    wait_for_call(&backend, "datasets", 1).await;

    backend.add_dataset("Batch 1", set, &[]);
    assert!(dashboard.refresh_datasets().await.unwrap());
    gate.open();

    assert!(!older.await.unwrap().unwrap());
    assert_eq!(dashboard.snapshot().datasets().len(), 1);
}

// =============================================================================
// Activation
// =============================================================================

#[tokio::test]
async fn test_duplicate_activation_is_suppressed() {
    let (backend, set) = seeded();
    let first = backend.add_dataset("Batch 1", set, &[]);
    let second = backend.add_dataset("Batch 2", set, &[]);
    let dashboard = Arc::new(Dashboard::new(Arc::clone(&backend)));
    dashboard.load().await.unwrap();

    let gate = backend.hold(GateKey::Activate(second));
    let pending = tokio::spawn({
        let dashboard = Arc::clone(&dashboard);
        async move { dashboard.activate(second).await }
    });
    wait_for_call(&backend, "activate", 1).await;

    assert!(dashboard.is_activating(second));
    assert_eq!(
        dashboard.activate(second).await.unwrap(),
        Activation::Suppressed
    );
    gate.open();

    assert!(matches!(
        pending.await.unwrap().unwrap(),
        Activation::Activated(_)
    ));
    assert_eq!(backend.calls("activate"), 1);
    assert!(!dashboard.is_activating(second));

    let state = dashboard.snapshot();
    assert_eq!(state.active_dataset().map(|d| d.id), Some(second));
    let statuses: Vec<_> = state
        .datasets()
        .iter()
        .map(|d| (d.id, d.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            (first, DatasetStatus::Inactive),
            (second, DatasetStatus::Active)
        ]
    );
}

#[tokio::test]
async fn test_failed_activation_leaves_state_untouched() {
    let (backend, set) = seeded();
    let dataset = backend.add_dataset("Batch 1", set, &[]);
    let dashboard = Dashboard::new(Arc::clone(&backend));
    dashboard.load().await.unwrap();
    let before = dashboard.snapshot();

    backend.fail_next(StateError::Server {
        status: 500,
        message: "Activation failed".to_string(),
    });
    let err = dashboard.activate(dataset).await.unwrap_err();

    assert_eq!(err.user_message(), "Activation failed");
    assert_eq!(backend.calls("datasets"), 1);
    assert_eq!(dashboard.snapshot().datasets(), before.datasets());
    assert!(dashboard.snapshot().active_dataset().is_none());
    assert!(!dashboard.is_activating(dataset));
}

#[tokio::test]
async fn test_activation_can_be_retried_after_failure() {
    let (backend, set) = seeded();
    let dataset = backend.add_dataset("Batch 1", set, &[]);
    let dashboard = Dashboard::new(Arc::clone(&backend));

    backend.fail_next(StateError::Network("connection reset".to_string()));
    assert!(dashboard.activate(dataset).await.is_err());
    assert!(matches!(
        dashboard.activate(dataset).await.unwrap(),
        Activation::Activated(_)
    ));
    assert_eq!(backend.calls("activate"), 2);
}

#[tokio::test]
async fn test_failed_refetch_after_activation_is_reported() {
    let (backend, set) = seeded();
    let dataset = backend.add_dataset("Batch 1", set, &[]);
    let dashboard = Arc::new(Dashboard::new(Arc::clone(&backend)));
    dashboard.load().await.unwrap();

    let gate = backend.hold(GateKey::Activate(dataset));
    let pending = tokio::spawn({
        let dashboard = Arc::clone(&dashboard);
        async move { dashboard.activate(dataset).await }
    });
    wait_for_call(&backend, "activate", 1).await;
    backend.fail_next(StateError::Network("connection reset".to_string()));
    gate.open();

    let activation = pending.await.unwrap().unwrap();
    assert_eq!(
        activation,
        Activation::Unrefreshed(StateError::Network("connection reset".to_string()))
    );
    assert!(!dashboard.is_activating(dataset));
    assert!(dashboard.snapshot().active_dataset().is_none());

    dashboard.refresh_datasets().await.unwrap();
    assert_eq!(dashboard.snapshot().active_dataset().map(|d| d.id), Some(dataset));
}

// =============================================================================
// Imports and edits
// =============================================================================

#[tokio::test]
async fn test_question_set_import_refreshes_collection() {
    let (backend, _) = seeded();
    let dashboard = Dashboard::new(Arc::clone(&backend));
    dashboard.load().await.unwrap();

    let form = QuestionSetForm {
        name: " Careers ".to_string(),
        description: "Second batch".to_string(),
        file: Some(Upload::new(
            "careers.csv",
            b"Questions,Strand\nLikes coding,STEM\nLikes selling,ABM\n".to_vec(),
        )),
    };
    let outcome = dashboard.import_question_set(&form).await;

    assert!(outcome.is_ready(), "{outcome:?}");
    let state = dashboard.snapshot();
    let created = state
        .question_sets()
        .iter()
        .find(|s| s.name == "Careers")
        .unwrap();
    assert_eq!(created.question_count, 2);
}

#[tokio::test]
async fn test_duplicate_question_set_name_is_rejected() {
    let (backend, _) = seeded();
    let dashboard = Dashboard::new(Arc::clone(&backend));

    let form = QuestionSetForm {
        name: "Interests".to_string(),
        description: String::new(),
        file: Some(Upload::new(
            "again.csv",
            b"Questions,Strand\nLikes coding,STEM\n".to_vec(),
        )),
    };
    let outcome = dashboard.import_question_set(&form).await;

    assert!(matches!(
        outcome.rejection(),
        Some(Rejection::NameConflict { name, .. }) if name == "Interests"
    ));
    assert_eq!(backend.calls("question_sets"), 0);
}

#[tokio::test]
async fn test_dataset_import_creates_records() {
    let (backend, set) = seeded();
    let dashboard = Dashboard::new(Arc::clone(&backend));
    dashboard.load().await.unwrap();

    let form = DatasetForm {
        name: "Batch 1".to_string(),
        description: "First cohort".to_string(),
        question_set: Some(set),
        file: Some(dataset_csv()),
    };
    let outcome = dashboard.import_dataset(&form, MatchPolicy::Strict).await;

    let IngestionOutcome::Ready(upload) = &outcome else {
        panic!("expected ready, got {outcome:?}");
    };
    assert_eq!(upload.accepted_count(), 2);
    let state = dashboard.snapshot();
    assert_eq!(state.datasets().len(), 1);
    assert_eq!(state.datasets()[0].row_count, 2);
    assert_eq!(state.datasets()[0].status, DatasetStatus::Inactive);
}

#[tokio::test]
async fn test_mismatched_dataset_is_never_submitted() {
    let (backend, set) = seeded();
    let dashboard = Dashboard::new(Arc::clone(&backend));

    let form = DatasetForm {
        name: "Batch 1".to_string(),
        description: "First cohort".to_string(),
        question_set: Some(set),
        file: Some(Upload::new(
            "responses.csv",
            b"Strand,Enjoys solving equations,Enjoys painting\nSTEM,5,1\n".to_vec(),
        )),
    };
    let outcome = dashboard.import_dataset(&form, MatchPolicy::Strict).await;

    let report = outcome.rejection().and_then(Rejection::discrepancies).unwrap();
    assert_eq!(
        report.missing_questions,
        vec!["Enjoys bookkeeping", "Enjoys reading history"]
    );
    assert_eq!(report.extra_questions, vec!["Enjoys painting"]);
    assert_eq!(backend.calls("import_dataset"), 0);
}

#[tokio::test]
async fn test_deleting_selected_dataset_clears_selection() {
    let (backend, set) = seeded();
    let dataset = backend.add_dataset("Batch 1", set, &[(Strand::Abm, [1.0, 8.0, 2.0])]);
    let dashboard = Dashboard::new(Arc::clone(&backend));
    dashboard.load().await.unwrap();
    dashboard.select_set(set).await.unwrap();
    dashboard.select_dataset(dataset).await.unwrap();

    dashboard.delete_dataset(dataset).await.unwrap();

    let state = dashboard.snapshot();
    assert_eq!(state.selection(), Selection::SetSelected(set));
    assert!(state.datasets().is_empty());
    assert!(state.records().is_empty());
}

#[tokio::test]
async fn test_deleting_question_set_cascades() {
    let (backend, set) = seeded();
    backend.add_dataset("Batch 1", set, &[]);
    let dashboard = Dashboard::new(Arc::clone(&backend));
    dashboard.load().await.unwrap();
    dashboard.select_set(set).await.unwrap();

    dashboard.delete_question_set(set).await.unwrap();

    let state = dashboard.snapshot();
    assert_eq!(state.selection(), Selection::Idle);
    assert!(state.question_sets().is_empty());
    assert!(state.datasets().is_empty());
}

#[tokio::test]
async fn test_rename_to_taken_name_conflicts() {
    let (backend, set) = seeded();
    let first = backend.add_dataset("Batch 1", set, &[]);
    backend.add_dataset("Batch 2", set, &[]);
    let dashboard = Dashboard::new(Arc::clone(&backend));
    dashboard.load().await.unwrap();

    let err = dashboard
        .update_dataset(first, "Batch 2", "renamed")
        .await
        .unwrap_err();
    assert!(matches!(err, StateError::NameConflict { ref name, .. } if name == "Batch 2"));

    dashboard
        .update_dataset(first, " Batch 1b ", "renamed")
        .await
        .unwrap();
    assert_eq!(dashboard.snapshot().datasets()[0].name, "Batch 1b");
}

// =============================================================================
// Session
// =============================================================================

#[tokio::test]
async fn test_login_stores_token_and_user() {
    let backend = MemoryBackend::new().with_admin("admin@school.test", "secret");
    let shared = session::shared(Session::new(Duration::minutes(5)));
    let credentials = Credentials {
        email: "admin@school.test".to_string(),
        password: "secret".to_string(),
    };

    let user = session::login(&backend, &shared, &credentials).await.unwrap();

    assert_eq!(user.email.as_deref(), Some("admin@school.test"));
    let mut guard = session::lock(&shared);
    assert!(guard.bearer().unwrap().starts_with("memory-token-"));
    assert_eq!(guard.user(), Some(&user));
}

#[tokio::test]
async fn test_wrong_password_leaves_session_signed_out() {
    let backend = MemoryBackend::new().with_admin("admin@school.test", "secret");
    let shared = session::shared(Session::default());
    let credentials = Credentials {
        email: "admin@school.test".to_string(),
        password: "guess".to_string(),
    };

    let err = session::login(&backend, &shared, &credentials).await.unwrap_err();

    assert_eq!(err.user_message(), "Invalid credentials");
    assert_eq!(session::lock(&shared).bearer(), Err(StateError::Unauthenticated));
}
