//! Cascading selection: question set → dataset → records.
//!
//! [`SelectionState`] is plain data. Each selection change bumps a generation
//! counter and hands out a ticket for the descendant fetch it triggers; a
//! fetch result is applied only while its ticket is still current, so a slow
//! response for a superseded selection is dropped instead of overwriting newer
//! state. Collections are always replaced wholesale.

use serde::{Deserialize, Serialize};
use survey_model::{Dataset, DatasetId, Question, QuestionSet, QuestionSetId, Record, Strand};

use crate::error::{Result, StateError};

/// Current selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Idle,
    SetSelected(QuestionSetId),
    DatasetSelected(QuestionSetId, DatasetId),
}

impl Selection {
    pub fn question_set(&self) -> Option<QuestionSetId> {
        match *self {
            Self::Idle => None,
            Self::SetSelected(set) | Self::DatasetSelected(set, _) => Some(set),
        }
    }

    pub fn dataset(&self) -> Option<DatasetId> {
        match *self {
            Self::DatasetSelected(_, dataset) => Some(dataset),
            _ => None,
        }
    }
}

/// Ticket for fetching the questions of a selected set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionsTicket {
    generation: u64,
    pub set: QuestionSetId,
}

/// Ticket for fetching the records of a selected dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordsTicket {
    generation: u64,
    pub dataset: DatasetId,
}

/// Ticket for a whole-collection refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
}

/// How the strand distribution aggregates records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionMode {
    /// Number of records per strand.
    #[default]
    Count,
    /// Summed strand scores across records.
    Score,
}

/// Per-strand totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrandDistribution {
    pub stem: f64,
    pub abm: f64,
    pub humss: f64,
}

impl StrandDistribution {
    pub fn get(&self, strand: Strand) -> f64 {
        match strand {
            Strand::Stem => self.stem,
            Strand::Abm => self.abm,
            Strand::Humss => self.humss,
        }
    }

    fn add(&mut self, strand: Strand, value: f64) {
        match strand {
            Strand::Stem => self.stem += value,
            Strand::Abm => self.abm += value,
            Strand::Humss => self.humss += value,
        }
    }

    /// Totals in display order.
    pub fn entries(&self) -> [(Strand, f64); 3] {
        Strand::ALL.map(|strand| (strand, self.get(strand)))
    }

    pub fn total(&self) -> f64 {
        self.stem + self.abm + self.humss
    }
}

/// Client-side collections and the selection over them.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    question_sets: Vec<QuestionSet>,
    datasets: Vec<Dataset>,
    questions: Vec<Question>,
    records: Vec<Record>,
    selection: Selection,
    set_generation: u64,
    dataset_generation: u64,
    question_sets_generation: u64,
    datasets_generation: u64,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    // === Accessors ===

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn question_sets(&self) -> &[QuestionSet] {
        &self.question_sets
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    /// Questions of the selected set, in fetch order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Records of the selected dataset, in fetch order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn selected_question_set(&self) -> Option<&QuestionSet> {
        let id = self.selection.question_set()?;
        self.question_sets.iter().find(|s| s.id == id)
    }

    pub fn selected_dataset(&self) -> Option<&Dataset> {
        let id = self.selection.dataset()?;
        self.datasets.iter().find(|d| d.id == id)
    }

    /// Datasets of the selected question set; empty when none is selected.
    pub fn filtered_datasets(&self) -> Vec<&Dataset> {
        match self.selection.question_set() {
            Some(set) => self
                .datasets
                .iter()
                .filter(|d| d.question_set_id == set)
                .collect(),
            None => Vec::new(),
        }
    }

    /// The dataset the server reports as active, if any.
    pub fn active_dataset(&self) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.is_active())
    }

    // === Selection changes ===

    fn clear_dataset(&mut self) {
        self.records.clear();
        self.dataset_generation += 1;
        if let Selection::DatasetSelected(set, _) = self.selection {
            self.selection = Selection::SetSelected(set);
        }
    }

    /// Selects a question set, discarding the previous set's descendants.
    ///
    /// Returns the ticket for fetching the set's questions.
    pub fn select_set(&mut self, set: QuestionSetId) -> Result<QuestionsTicket> {
        if !self.question_sets.iter().any(|s| s.id == set) {
            return Err(StateError::UnknownQuestionSet(set));
        }
        self.deselect_set();
        self.selection = Selection::SetSelected(set);
        Ok(QuestionsTicket {
            generation: self.set_generation,
            set,
        })
    }

    /// Returns to idle, clearing questions, records and the dataset selection.
    pub fn deselect_set(&mut self) {
        self.clear_dataset();
        self.questions.clear();
        self.selection = Selection::Idle;
        self.set_generation += 1;
    }

    /// Selects a dataset of the selected question set.
    ///
    /// Returns the ticket for fetching its records. A dataset outside the
    /// filtered subset is refused and the state is left unchanged.
    pub fn select_dataset(&mut self, dataset: DatasetId) -> Result<RecordsTicket> {
        let selectable = self.filtered_datasets().iter().any(|d| d.id == dataset);
        let Some(set) = self.selection.question_set().filter(|_| selectable) else {
            return Err(StateError::DatasetNotSelectable(dataset));
        };
        self.clear_dataset();
        self.selection = Selection::DatasetSelected(set, dataset);
        Ok(RecordsTicket {
            generation: self.dataset_generation,
            dataset,
        })
    }

    pub fn deselect_dataset(&mut self) {
        self.clear_dataset();
    }

    // === Fetch results ===

    /// Applies fetched questions; returns false if the ticket is stale.
    pub fn apply_questions(&mut self, ticket: QuestionsTicket, questions: Vec<Question>) -> bool {
        let current = ticket.generation == self.set_generation
            && self.selection.question_set() == Some(ticket.set);
        if current {
            self.questions = questions;
        } else {
            tracing::debug!(set = %ticket.set, "dropping stale questions response");
        }
        current
    }

    /// Applies fetched records; returns false if the ticket is stale.
    pub fn apply_records(&mut self, ticket: RecordsTicket, records: Vec<Record>) -> bool {
        let current = ticket.generation == self.dataset_generation
            && self.selection.dataset() == Some(ticket.dataset);
        if current {
            self.records = records;
        } else {
            tracing::debug!(dataset = %ticket.dataset, "dropping stale records response");
        }
        current
    }

    /// Starts a question-set collection refresh.
    pub fn begin_question_sets_refresh(&mut self) -> RefreshTicket {
        self.question_sets_generation += 1;
        RefreshTicket {
            generation: self.question_sets_generation,
        }
    }

    /// Replaces the question-set collection unless a newer refresh started.
    /// A selected set that no longer exists is deselected.
    pub fn apply_question_sets(&mut self, ticket: RefreshTicket, sets: Vec<QuestionSet>) -> bool {
        if ticket.generation != self.question_sets_generation {
            tracing::debug!("dropping stale question set collection");
            return false;
        }
        self.question_sets = sets;
        if let Some(set) = self.selection.question_set()
            && !self.question_sets.iter().any(|s| s.id == set)
        {
            self.deselect_set();
        }
        true
    }

    /// Starts a dataset collection refresh.
    pub fn begin_datasets_refresh(&mut self) -> RefreshTicket {
        self.datasets_generation += 1;
        RefreshTicket {
            generation: self.datasets_generation,
        }
    }

    /// Replaces the dataset collection unless a newer refresh started.
    /// A selected dataset that left the filtered subset is deselected.
    pub fn apply_datasets(&mut self, ticket: RefreshTicket, datasets: Vec<Dataset>) -> bool {
        if ticket.generation != self.datasets_generation {
            tracing::debug!("dropping stale dataset collection");
            return false;
        }
        self.datasets = datasets;
        if let Some(dataset) = self.selection.dataset()
            && !self.filtered_datasets().iter().any(|d| d.id == dataset)
        {
            self.clear_dataset();
        }
        true
    }

    // === Derived views ===

    /// Strand distribution of the current selection.
    ///
    /// With a dataset selected, records are counted or their scores summed per
    /// `mode`. With only a set selected, questions are counted per strand.
    /// `None` when there is nothing to aggregate.
    pub fn distribution(&self, mode: DistributionMode) -> Option<StrandDistribution> {
        let mut distribution = StrandDistribution::default();
        if self.selection.dataset().is_some() && !self.records.is_empty() {
            for record in &self.records {
                match mode {
                    DistributionMode::Count => {
                        if let Some(strand) = record.strand_label() {
                            distribution.add(strand, 1.0);
                        }
                    }
                    DistributionMode::Score => {
                        for strand in Strand::ALL {
                            distribution.add(strand, record.score(strand));
                        }
                    }
                }
            }
            return Some(distribution);
        }
        if self.selection.question_set().is_some() && !self.questions.is_empty() {
            for strand in self.questions.iter().filter_map(Question::strand_label) {
                distribution.add(strand, 1.0);
            }
            return Some(distribution);
        }
        None
    }
}
