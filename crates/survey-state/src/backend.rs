//! Backend abstraction.
//!
//! The [`Backend`] trait is the single seam between client state and the
//! server. [`crate::http::HttpBackend`] talks JSON over HTTP;
//! [`crate::fakes::MemoryBackend`] keeps everything in memory for tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use survey_ingest::{ValidDatasetRow, ValidQuestionRow};
use survey_model::{
    AssessmentResult, CurrentUser, Dataset, DatasetId, Question, QuestionSet, QuestionSetId,
    Record,
};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Sign-in credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// One question of a new question set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question_text: String,
    pub strand: String,
}

impl From<&ValidQuestionRow> for NewQuestion {
    fn from(row: &ValidQuestionRow) -> Self {
        Self {
            question_text: row.question_text.clone(),
            strand: row
                .strand_label()
                .map_or_else(|| row.strand.clone(), |s| s.code().to_string()),
        }
    }
}

/// Body of a question-set import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestionSet {
    pub question_set_name: String,
    pub description: String,
    pub questions: Vec<NewQuestion>,
}

/// Body of a question-set edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSetUpdate {
    pub question_set_name: String,
    pub description: String,
}

/// Body of a dataset import: respondent rows keyed by sheet header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetImport {
    pub dataset_name: String,
    pub description: String,
    pub question_set_id: QuestionSetId,
    pub rows: Vec<BTreeMap<String, String>>,
}

impl DatasetImport {
    pub fn new<'a>(
        dataset_name: impl Into<String>,
        description: impl Into<String>,
        question_set_id: QuestionSetId,
        rows: impl IntoIterator<Item = &'a ValidDatasetRow>,
    ) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            description: description.into(),
            question_set_id,
            rows: rows.into_iter().map(ValidDatasetRow::wire_cells).collect(),
        }
    }
}

/// Body of a dataset edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetUpdate {
    pub data_set_name: String,
    pub data_set_description: String,
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Server operations used by the admin tool.
///
/// Writes return nothing: callers re-fetch the affected collection instead of
/// patching local copies.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Exchanges credentials for a bearer token.
    async fn login(&self, credentials: &Credentials) -> Result<String>;

    async fn current_user(&self) -> Result<CurrentUser>;

    // === Question sets ===
    async fn question_sets(&self) -> Result<Vec<QuestionSet>>;

    /// Questions of one set, in set order.
    async fn questions(&self, set: QuestionSetId) -> Result<Vec<Question>>;

    async fn create_question_set(&self, request: &NewQuestionSet) -> Result<()>;

    async fn update_question_set(
        &self,
        set: QuestionSetId,
        update: &QuestionSetUpdate,
    ) -> Result<()>;

    /// Deletes a set; the server cascades to its datasets.
    async fn delete_question_set(&self, set: QuestionSetId) -> Result<()>;

    // === Datasets ===
    async fn datasets(&self) -> Result<Vec<Dataset>>;

    async fn import_dataset(&self, request: &DatasetImport) -> Result<()>;

    async fn update_dataset(&self, dataset: DatasetId, update: &DatasetUpdate) -> Result<()>;

    async fn delete_dataset(&self, dataset: DatasetId) -> Result<()>;

    async fn records(&self, dataset: DatasetId) -> Result<Vec<Record>>;

    /// Marks a dataset Active; the server deactivates every other one.
    async fn activate(&self, dataset: DatasetId) -> Result<()>;

    // === Results ===
    async fn results(&self) -> Result<Vec<AssessmentResult>>;
}
