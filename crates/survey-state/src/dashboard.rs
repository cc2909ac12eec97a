//! Async driver over [`SelectionState`].
//!
//! Each operation takes the state lock only for short synchronous sections:
//! once to take a ticket, once to apply the response. The lock is never held
//! across an await, so concurrent operations interleave freely and the ticket
//! check decides which response wins.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use survey_ingest::{IngestionOutcome, MatchPolicy};
use survey_model::{DatasetId, QuestionSetId};

use crate::activation::{Activation, ActivationManager};
use crate::backend::{Backend, DatasetUpdate, QuestionSetUpdate};
use crate::error::Result;
use crate::import::{DatasetForm, QuestionSetForm};
use crate::selection::SelectionState;

/// Selection state bound to a backend.
pub struct Dashboard<B: ?Sized> {
    backend: Arc<B>,
    state: Mutex<SelectionState>,
    activation: ActivationManager,
}

impl<B: Backend + ?Sized> Dashboard<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            state: Mutex::new(SelectionState::new()),
            activation: ActivationManager::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn lock(&self) -> MutexGuard<'_, SelectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> SelectionState {
        self.lock().clone()
    }

    /// Runs `f` against the current state.
    pub fn with_state<R>(&self, f: impl FnOnce(&SelectionState) -> R) -> R {
        f(&self.lock())
    }

    // === Collections ===

    /// Re-fetches question sets. Returns false if a newer refresh won.
    pub async fn refresh_question_sets(&self) -> Result<bool> {
        let ticket = self.lock().begin_question_sets_refresh();
        let sets = self.backend.question_sets().await?;
        Ok(self.lock().apply_question_sets(ticket, sets))
    }

    /// Re-fetches datasets. Returns false if a newer refresh won.
    pub async fn refresh_datasets(&self) -> Result<bool> {
        let ticket = self.lock().begin_datasets_refresh();
        let datasets = self.backend.datasets().await?;
        Ok(self.lock().apply_datasets(ticket, datasets))
    }

    /// Loads both top-level collections.
    pub async fn load(&self) -> Result<()> {
        self.refresh_question_sets().await?;
        self.refresh_datasets().await?;
        Ok(())
    }

    // === Selection ===

    /// Selects a question set and fetches its questions.
    ///
    /// Returns false when a later selection change superseded this one
    /// before the questions arrived.
    pub async fn select_set(&self, set: QuestionSetId) -> Result<bool> {
        let ticket = self.lock().select_set(set)?;
        let questions = self.backend.questions(set).await?;
        Ok(self.lock().apply_questions(ticket, questions))
    }

    pub fn deselect_set(&self) {
        self.lock().deselect_set();
    }

    /// Selects a dataset of the selected set and fetches its records.
    pub async fn select_dataset(&self, dataset: DatasetId) -> Result<bool> {
        let ticket = self.lock().select_dataset(dataset)?;
        let records = self.backend.records(dataset).await?;
        Ok(self.lock().apply_records(ticket, records))
    }

    pub fn deselect_dataset(&self) {
        self.lock().deselect_dataset();
    }

    // === Activation ===

    /// Activates a dataset and replaces the dataset collection with the
    /// server's view. On failure the collection is left as it was.
    pub async fn activate(&self, dataset: DatasetId) -> Result<Activation> {
        let mut ticket = None;
        let activation = self
            .activation
            .activate_with(self.backend.as_ref(), dataset, || {
                ticket = Some(self.lock().begin_datasets_refresh());
            })
            .await?;
        if let (Activation::Activated(datasets), Some(ticket)) = (&activation, ticket) {
            self.lock().apply_datasets(ticket, datasets.clone());
        }
        Ok(activation)
    }

    pub fn is_activating(&self, dataset: DatasetId) -> bool {
        self.activation.is_in_flight(dataset)
    }

    // === Edits ===

    pub async fn update_question_set(
        &self,
        set: QuestionSetId,
        name: &str,
        description: &str,
    ) -> Result<()> {
        let update = QuestionSetUpdate {
            question_set_name: name.trim().to_string(),
            description: description.trim().to_string(),
        };
        self.backend.update_question_set(set, &update).await?;
        self.refresh_question_sets().await?;
        Ok(())
    }

    /// Deletes a question set. Its datasets go with it on the server, so both
    /// collections are re-fetched.
    pub async fn delete_question_set(&self, set: QuestionSetId) -> Result<()> {
        self.backend.delete_question_set(set).await?;
        {
            let mut state = self.lock();
            if state.selection().question_set() == Some(set) {
                state.deselect_set();
            }
        }
        self.load().await
    }

    pub async fn update_dataset(
        &self,
        dataset: DatasetId,
        name: &str,
        description: &str,
    ) -> Result<()> {
        let update = DatasetUpdate {
            data_set_name: name.trim().to_string(),
            data_set_description: description.trim().to_string(),
        };
        self.backend.update_dataset(dataset, &update).await?;
        self.refresh_datasets().await?;
        Ok(())
    }

    pub async fn delete_dataset(&self, dataset: DatasetId) -> Result<()> {
        self.backend.delete_dataset(dataset).await?;
        {
            let mut state = self.lock();
            if state.selection().dataset() == Some(dataset) {
                state.deselect_dataset();
            }
        }
        self.refresh_datasets().await?;
        Ok(())
    }

    // === Imports ===

    /// Submits a question-set import and, on success, refreshes question sets.
    pub async fn import_question_set(&self, form: &QuestionSetForm) -> IngestionOutcome {
        let outcome = form.submit(self.backend.as_ref()).await;
        if outcome.is_ready()
            && let Err(err) = self.refresh_question_sets().await
        {
            tracing::warn!(error = %err, "question sets could not be refreshed after import");
        }
        outcome
    }

    /// Submits a dataset import and, on success, refreshes datasets.
    pub async fn import_dataset(&self, form: &DatasetForm, policy: MatchPolicy) -> IngestionOutcome {
        let outcome = form.submit(self.backend.as_ref(), policy).await;
        if outcome.is_ready()
            && let Err(err) = self.refresh_datasets().await
        {
            tracing::warn!(error = %err, "datasets could not be refreshed after import");
        }
        outcome
    }
}
