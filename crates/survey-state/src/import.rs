//! Import forms and submission.
//!
//! Both flows run an upload through [`survey_ingest`] and only talk to the
//! server when the upload is ready. Every failure, local or remote, comes back
//! as an [`IngestionOutcome`].

use std::path::Path;

use survey_ingest::{
    FileKind, IngestionOutcome, MatchPolicy, ReferenceQuestions, Rejection, ingest_dataset,
    ingest_question_set,
};
use survey_model::QuestionSetId;

use crate::backend::{Backend, DatasetImport, NewQuestion, NewQuestionSet};

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Reads a file from disk, keeping only its file name.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, bytes))
    }

    fn kind(&self) -> Result<FileKind, Rejection> {
        FileKind::from_path(Path::new(&self.file_name)).map_err(Rejection::from)
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn missing_fields(fields: &[(&str, bool)]) -> Option<Rejection> {
    let fields: Vec<String> = fields
        .iter()
        .filter(|(_, missing)| *missing)
        .map(|(name, _)| (*name).to_string())
        .collect();
    (!fields.is_empty()).then_some(Rejection::MissingFields { fields })
}

// =============================================================================
// QUESTION SETS
// =============================================================================

/// Fields of the question-set import form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionSetForm {
    pub name: String,
    pub description: String,
    pub file: Option<Upload>,
}

impl QuestionSetForm {
    /// Validates the form and the uploaded sheet without contacting the
    /// server.
    pub fn check(&self) -> IngestionOutcome {
        if let Some(rejection) = missing_fields(&[
            ("name", blank(&self.name)),
            ("file", self.file.is_none()),
        ]) {
            return rejection.into();
        }
        let Some(file) = &self.file else {
            return Rejection::MissingFields {
                fields: vec!["file".to_string()],
            }
            .into();
        };
        match file.kind() {
            Ok(kind) => ingest_question_set(&file.bytes, kind),
            Err(rejection) => rejection.into(),
        }
    }

    /// Validates the form and, if ready, creates the question set.
    pub async fn submit<B: Backend + ?Sized>(&self, backend: &B) -> IngestionOutcome {
        let outcome = self.check();
        let IngestionOutcome::Ready(upload) = &outcome else {
            return outcome;
        };
        let request = NewQuestionSet {
            question_set_name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            questions: upload.questions().map(NewQuestion::from).collect(),
        };
        match backend.create_question_set(&request).await {
            Ok(()) => {
                tracing::info!(
                    name = %request.question_set_name,
                    questions = request.questions.len(),
                    "question set created"
                );
                outcome
            }
            Err(err) => Rejection::from(err).into(),
        }
    }
}

// =============================================================================
// DATASETS
// =============================================================================

/// Fields of the dataset import form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetForm {
    pub name: String,
    pub description: String,
    pub question_set: Option<QuestionSetId>,
    pub file: Option<Upload>,
}

impl DatasetForm {
    /// Names of required fields left empty.
    fn missing(&self) -> Option<Rejection> {
        missing_fields(&[
            ("name", blank(&self.name)),
            ("description", blank(&self.description)),
            ("question_set", self.question_set.is_none()),
            ("file", self.file.is_none()),
        ])
    }

    /// Validates the form and reconciles the upload against `reference`.
    pub fn check_against(
        &self,
        reference: &ReferenceQuestions,
        policy: MatchPolicy,
    ) -> IngestionOutcome {
        if let Some(rejection) = self.missing() {
            return rejection.into();
        }
        let Some(file) = &self.file else {
            return Rejection::MissingFields {
                fields: vec!["file".to_string()],
            }
            .into();
        };
        match file.kind() {
            Ok(kind) => ingest_dataset(&file.bytes, kind, reference, policy),
            Err(rejection) => rejection.into(),
        }
    }

    /// Fetches the reference questions of the chosen set and checks the
    /// upload against them.
    pub async fn check<B: Backend + ?Sized>(
        &self,
        backend: &B,
        policy: MatchPolicy,
    ) -> IngestionOutcome {
        if let Some(rejection) = self.missing() {
            return rejection.into();
        }
        let Some(set) = self.question_set else {
            return Rejection::MissingFields {
                fields: vec!["question_set".to_string()],
            }
            .into();
        };
        match backend.questions(set).await {
            Ok(questions) => {
                self.check_against(&ReferenceQuestions::from_questions(&questions), policy)
            }
            Err(err) => Rejection::from(err).into(),
        }
    }

    /// Checks the upload and, if ready, imports the dataset.
    pub async fn submit<B: Backend + ?Sized>(
        &self,
        backend: &B,
        policy: MatchPolicy,
    ) -> IngestionOutcome {
        let outcome = self.check(backend, policy).await;
        let Some(set) = self.question_set else {
            return outcome;
        };
        let IngestionOutcome::Ready(upload) = &outcome else {
            return outcome;
        };
        let request = DatasetImport::new(
            self.name.trim(),
            self.description.trim(),
            set,
            upload.dataset_rows(),
        );
        match backend.import_dataset(&request).await {
            Ok(()) => {
                tracing::info!(
                    name = %request.dataset_name,
                    rows = request.rows.len(),
                    "dataset imported"
                );
                outcome
            }
            Err(err) => Rejection::from(err).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_form_lists_every_missing_field() {
        let form = DatasetForm {
            name: "  ".to_string(),
            ..DatasetForm::default()
        };
        let outcome = form.check_against(&ReferenceQuestions::default(), MatchPolicy::Strict);
        assert_eq!(
            outcome.rejection(),
            Some(&Rejection::MissingFields {
                fields: vec![
                    "name".to_string(),
                    "description".to_string(),
                    "question_set".to_string(),
                    "file".to_string()
                ]
            })
        );
    }

    #[test]
    fn test_unsupported_extension_is_parse_error() {
        let form = QuestionSetForm {
            name: "Strand survey".to_string(),
            description: String::new(),
            file: Some(Upload::new("questions.pdf", b"%PDF".to_vec())),
        };
        assert_eq!(form.check().rejection().map(Rejection::kind), Some("parse_error"));
    }

    #[test]
    fn test_question_set_form_checks_sheet() {
        let form = QuestionSetForm {
            name: "Strand survey".to_string(),
            description: String::new(),
            file: Some(Upload::new("questions.CSV", b"Questions,Strand\nQ1,STEM\n".to_vec())),
        };
        assert!(form.check().is_ready());
    }
}
