//! In-memory backend for tests and offline use.
//!
//! [`MemoryBackend`] follows the server's contracts: unique names (409 on
//! conflict), at most one active dataset, cascade on question-set delete.
//! Calls can be held at a [`Gate`] to script response ordering, and the next
//! call can be made to fail.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use survey_model::{
    AssessmentResult, CurrentUser, Dataset, DatasetId, DatasetStatus, Question, QuestionId,
    QuestionSet, QuestionSetId, Record, RecordId, Strand,
};
use tokio::sync::Notify;

use crate::backend::{
    Backend, Credentials, DatasetImport, DatasetUpdate, NewQuestionSet, QuestionSetUpdate,
};
use crate::error::{Result, StateError};

/// Calls that can be held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateKey {
    Questions(QuestionSetId),
    Records(DatasetId),
    Datasets,
    Activate(DatasetId),
}

/// Holds one call until opened.
#[derive(Debug, Clone)]
pub struct Gate(Arc<Notify>);

impl Gate {
    /// Lets the held call continue. Opening before the call arrives lets it
    /// through without waiting.
    pub fn open(&self) {
        self.0.notify_one();
    }
}

#[derive(Debug, Default)]
struct Store {
    admin: Option<Credentials>,
    user: CurrentUser,
    question_sets: Vec<QuestionSet>,
    questions: HashMap<QuestionSetId, Vec<Question>>,
    datasets: Vec<Dataset>,
    records: HashMap<DatasetId, Vec<Record>>,
    results: Vec<AssessmentResult>,
    next_id: i64,
    gates: HashMap<GateKey, Gate>,
    failure: Option<StateError>,
    calls: Vec<String>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

fn conflict(name: &str, what: &str) -> StateError {
    StateError::NameConflict {
        name: name.to_string(),
        message: format!("A {what} with this name already exists."),
    }
}

fn not_found(what: &str) -> StateError {
    StateError::Server {
        status: 404,
        message: format!("{what} not found"),
    }
}

/// Backend that keeps every collection in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    store: Mutex<Store>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // === Seeding ===

    /// Accepts these credentials at login.
    pub fn with_admin(self, email: &str, password: &str) -> Self {
        {
            let mut store = self.store();
            store.admin = Some(Credentials {
                email: email.to_string(),
                password: password.to_string(),
            });
            store.user = CurrentUser {
                email: Some(email.to_string()),
                role: Some("ADMIN".to_string()),
                ..CurrentUser::default()
            };
        }
        self
    }

    /// Adds a question set with `(text, strand)` questions.
    pub fn add_question_set(&self, name: &str, questions: &[(&str, Strand)]) -> QuestionSetId {
        let mut store = self.store();
        let id = QuestionSetId(store.next_id());
        let questions: Vec<Question> = questions
            .iter()
            .map(|(text, strand)| Question {
                id: QuestionId(store.next_id()),
                text: (*text).to_string(),
                strand: strand.code().to_string(),
            })
            .collect();
        store.question_sets.push(QuestionSet {
            id,
            name: name.to_string(),
            description: None,
            created_at: Some(Utc::now().naive_utc()),
            question_count: questions.len(),
        });
        store.questions.insert(id, questions);
        id
    }

    /// Adds an inactive dataset with `(strand, [stem, abm, humss])` records.
    pub fn add_dataset(
        &self,
        name: &str,
        set: QuestionSetId,
        records: &[(Strand, [f64; 3])],
    ) -> DatasetId {
        let mut store = self.store();
        let id = DatasetId(store.next_id());
        let records: Vec<Record> = records
            .iter()
            .map(|(strand, scores)| Record {
                id: RecordId(store.next_id()),
                dataset_id: id,
                strand: strand.code().to_string(),
                stem_score: scores[0],
                abm_score: scores[1],
                humss_score: scores[2],
            })
            .collect();
        store.datasets.push(Dataset {
            id,
            name: name.to_string(),
            description: None,
            question_set_id: set,
            status: DatasetStatus::Inactive,
            created_at: Some(Utc::now().naive_utc()),
            row_count: records.len(),
            best_k: None,
            accuracy: None,
        });
        store.records.insert(id, records);
        id
    }

    pub fn set_results(&self, results: Vec<AssessmentResult>) {
        self.store().results = results;
    }

    // === Scripting ===

    /// Holds the next call matching `key` until the returned gate opens.
    pub fn hold(&self, key: GateKey) -> Gate {
        let gate = Gate(Arc::new(Notify::new()));
        self.store().gates.insert(key, gate.clone());
        gate
    }

    /// Makes the next call fail with `error`.
    pub fn fail_next(&self, error: StateError) {
        self.store().failure = Some(error);
    }

    /// Number of calls made to the named operation.
    pub fn calls(&self, operation: &str) -> usize {
        self.store()
            .calls
            .iter()
            .filter(|call| call.as_str() == operation)
            .count()
    }

    /// Records the call and returns the injected failure, if any.
    fn enter(&self, operation: &str) -> Result<()> {
        let mut store = self.store();
        store.calls.push(operation.to_string());
        store.failure.take().map_or(Ok(()), Err)
    }

    async fn pass(&self, key: GateKey) {
        let gate = self.store().gates.remove(&key);
        if let Some(gate) = gate {
            gate.0.notified().await;
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn login(&self, credentials: &Credentials) -> Result<String> {
        self.enter("login")?;
        let store = self.store();
        match &store.admin {
            Some(admin) if admin == credentials => Ok(format!("memory-token-{}", admin.email)),
            _ => Err(StateError::Server {
                status: 401,
                message: "Invalid credentials".to_string(),
            }),
        }
    }

    async fn current_user(&self) -> Result<CurrentUser> {
        self.enter("current_user")?;
        Ok(self.store().user.clone())
    }

    async fn question_sets(&self) -> Result<Vec<QuestionSet>> {
        self.enter("question_sets")?;
        Ok(self.store().question_sets.clone())
    }

    async fn questions(&self, set: QuestionSetId) -> Result<Vec<Question>> {
        self.enter("questions")?;
        self.pass(GateKey::Questions(set)).await;
        let store = self.store();
        store
            .questions
            .get(&set)
            .cloned()
            .ok_or_else(|| not_found("Question set"))
    }

    async fn create_question_set(&self, request: &NewQuestionSet) -> Result<()> {
        self.enter("create_question_set")?;
        let mut store = self.store();
        if store
            .question_sets
            .iter()
            .any(|s| s.name == request.question_set_name)
        {
            return Err(conflict(&request.question_set_name, "question set"));
        }
        let id = QuestionSetId(store.next_id());
        let questions: Vec<Question> = request
            .questions
            .iter()
            .map(|q| Question {
                id: QuestionId(store.next_id()),
                text: q.question_text.clone(),
                strand: q.strand.clone(),
            })
            .collect();
        store.question_sets.push(QuestionSet {
            id,
            name: request.question_set_name.clone(),
            description: Some(request.description.clone()),
            created_at: Some(Utc::now().naive_utc()),
            question_count: questions.len(),
        });
        store.questions.insert(id, questions);
        Ok(())
    }

    async fn update_question_set(
        &self,
        set: QuestionSetId,
        update: &QuestionSetUpdate,
    ) -> Result<()> {
        self.enter("update_question_set")?;
        let mut store = self.store();
        if store
            .question_sets
            .iter()
            .any(|s| s.id != set && s.name == update.question_set_name)
        {
            return Err(conflict(&update.question_set_name, "question set"));
        }
        let entry = store
            .question_sets
            .iter_mut()
            .find(|s| s.id == set)
            .ok_or_else(|| not_found("Question set"))?;
        entry.name = update.question_set_name.clone();
        entry.description = Some(update.description.clone());
        Ok(())
    }

    async fn delete_question_set(&self, set: QuestionSetId) -> Result<()> {
        self.enter("delete_question_set")?;
        let mut store = self.store();
        let before = store.question_sets.len();
        store.question_sets.retain(|s| s.id != set);
        if store.question_sets.len() == before {
            return Err(not_found("Question set"));
        }
        store.questions.remove(&set);
        let removed: Vec<DatasetId> = store
            .datasets
            .iter()
            .filter(|d| d.question_set_id == set)
            .map(|d| d.id)
            .collect();
        store.datasets.retain(|d| d.question_set_id != set);
        for id in removed {
            store.records.remove(&id);
        }
        Ok(())
    }

    async fn datasets(&self) -> Result<Vec<Dataset>> {
        self.enter("datasets")?;
        // Snapshot before waiting so a held refresh returns what it saw.
        let datasets = self.store().datasets.clone();
        self.pass(GateKey::Datasets).await;
        Ok(datasets)
    }

    async fn import_dataset(&self, request: &DatasetImport) -> Result<()> {
        self.enter("import_dataset")?;
        let mut store = self.store();
        if store.datasets.iter().any(|d| d.name == request.dataset_name) {
            return Err(conflict(&request.dataset_name, "dataset"));
        }
        if !store.questions.contains_key(&request.question_set_id) {
            return Err(StateError::Server {
                status: 400,
                message: "No questions found for this question set".to_string(),
            });
        }
        let id = DatasetId(store.next_id());
        let records: Vec<Record> = request
            .rows
            .iter()
            .map(|row| Record {
                id: RecordId(store.next_id()),
                dataset_id: id,
                strand: row.get("Strand").cloned().unwrap_or_default(),
                stem_score: 0.0,
                abm_score: 0.0,
                humss_score: 0.0,
            })
            .collect();
        store.datasets.push(Dataset {
            id,
            name: request.dataset_name.clone(),
            description: Some(request.description.clone()),
            question_set_id: request.question_set_id,
            status: DatasetStatus::Inactive,
            created_at: Some(Utc::now().naive_utc()),
            row_count: records.len(),
            best_k: None,
            accuracy: None,
        });
        store.records.insert(id, records);
        Ok(())
    }

    async fn update_dataset(&self, dataset: DatasetId, update: &DatasetUpdate) -> Result<()> {
        self.enter("update_dataset")?;
        let mut store = self.store();
        if store
            .datasets
            .iter()
            .any(|d| d.id != dataset && d.name == update.data_set_name)
        {
            return Err(conflict(&update.data_set_name, "dataset"));
        }
        let entry = store
            .datasets
            .iter_mut()
            .find(|d| d.id == dataset)
            .ok_or_else(|| not_found("Dataset"))?;
        entry.name = update.data_set_name.clone();
        entry.description = Some(update.data_set_description.clone());
        Ok(())
    }

    async fn delete_dataset(&self, dataset: DatasetId) -> Result<()> {
        self.enter("delete_dataset")?;
        let mut store = self.store();
        let before = store.datasets.len();
        store.datasets.retain(|d| d.id != dataset);
        if store.datasets.len() == before {
            return Err(not_found("Dataset"));
        }
        store.records.remove(&dataset);
        Ok(())
    }

    async fn records(&self, dataset: DatasetId) -> Result<Vec<Record>> {
        self.enter("records")?;
        self.pass(GateKey::Records(dataset)).await;
        let store = self.store();
        store
            .records
            .get(&dataset)
            .cloned()
            .ok_or_else(|| not_found("Dataset"))
    }

    async fn activate(&self, dataset: DatasetId) -> Result<()> {
        self.enter("activate")?;
        self.pass(GateKey::Activate(dataset)).await;
        let mut store = self.store();
        if !store.datasets.iter().any(|d| d.id == dataset) {
            return Err(not_found("Dataset"));
        }
        for entry in &mut store.datasets {
            entry.status = if entry.id == dataset {
                DatasetStatus::Active
            } else {
                DatasetStatus::Inactive
            };
        }
        Ok(())
    }

    async fn results(&self) -> Result<Vec<AssessmentResult>> {
        self.enter("results")?;
        Ok(self.store().results.clone())
    }
}
