//! Dataset reconciliation against a reference question set.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use survey_model::{Question, Strand};

use crate::rows::ValidQuestionRow;
use crate::schema::DatasetSheet;

/// How question texts are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Trimmed, case-insensitive exact match.
    #[default]
    Strict,
    /// Like `Strict`, and `&` equals `and` and whitespace runs collapse.
    Lenient,
}

impl MatchPolicy {
    /// Comparison key for a question text.
    pub fn key(&self, text: &str) -> String {
        match self {
            Self::Strict => text.trim().to_lowercase(),
            Self::Lenient => text
                .replace('&', " and ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
        }
    }
}

/// Questions of the reference question set, in set order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceQuestions {
    entries: Vec<(String, Option<Strand>)>,
}

impl ReferenceQuestions {
    /// From questions fetched from the server.
    pub fn from_questions(questions: &[Question]) -> Self {
        Self {
            entries: questions
                .iter()
                .map(|q| (q.text.clone(), q.strand_label()))
                .collect(),
        }
    }

    /// From a validated question-set upload.
    pub fn from_rows(rows: &[ValidQuestionRow]) -> Self {
        Self {
            entries: rows
                .iter()
                .map(|row| (row.question_text.clone(), row.strand_label()))
                .collect(),
        }
    }

    /// From bare question texts, without strands.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: texts.into_iter().map(|t| (t.into(), None)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Question texts in set order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(text, _)| text.as_str())
    }

    /// Question texts with their strands.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<Strand>)> {
        self.entries.iter().map(|(text, strand)| (text.as_str(), *strand))
    }

    /// Strand of the reference question matching `text`, if any.
    pub fn strand_of(&self, text: &str, policy: MatchPolicy) -> Option<Strand> {
        let key = policy.key(text);
        self.entries
            .iter()
            .find(|(reference, _)| policy.key(reference) == key)
            .and_then(|(_, strand)| *strand)
    }
}

/// Differences between a dataset upload and its reference question set.
///
/// Also the shape of the server's import error payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscrepancyReport {
    /// Reference questions with no uploaded column.
    #[serde(default)]
    pub missing_questions: Vec<String>,
    /// Uploaded columns matching no reference question, or one already
    /// matched by an earlier column.
    #[serde(default)]
    pub extra_questions: Vec<String>,
    /// Sheet row numbers whose strand is empty or unrecognised.
    #[serde(default)]
    pub missing_strand_rows: Vec<usize>,
    /// Human-readable summary.
    #[serde(default)]
    pub error: String,
}

impl DiscrepancyReport {
    /// Returns true when all three lists are empty.
    pub fn is_clean(&self) -> bool {
        self.missing_questions.is_empty()
            && self.extra_questions.is_empty()
            && self.missing_strand_rows.is_empty()
    }

    fn summarize(&self) -> String {
        if self.is_clean() {
            return String::new();
        }
        let mut parts = Vec::new();
        if !self.missing_questions.is_empty() {
            parts.push(format!(
                "{} question(s) missing from the file",
                self.missing_questions.len()
            ));
        }
        if !self.extra_questions.is_empty() {
            parts.push(format!(
                "{} question(s) not in the question set",
                self.extra_questions.len()
            ));
        }
        if !self.missing_strand_rows.is_empty() {
            parts.push(format!(
                "{} row(s) without a valid strand",
                self.missing_strand_rows.len()
            ));
        }
        format!("Import failed: {}.", parts.join("; "))
    }
}

/// Compares a dataset upload with the reference questions.
///
/// All three lists are always computed. The report is clean when the upload
/// may be submitted.
pub fn reconcile(
    sheet: &DatasetSheet,
    reference: &ReferenceQuestions,
    policy: MatchPolicy,
) -> DiscrepancyReport {
    let uploaded: HashSet<String> = sheet
        .question_columns
        .iter()
        .map(|col| policy.key(col))
        .collect();
    let known: HashSet<String> = reference.texts().map(|text| policy.key(text)).collect();

    let missing_questions = reference
        .texts()
        .filter(|text| !uploaded.contains(&policy.key(text)))
        .map(str::to_string)
        .collect();
    // A second column matching an already matched question counts as extra.
    let mut matched = HashSet::new();
    let extra_questions = sheet
        .question_columns
        .iter()
        .filter(|col| {
            let key = policy.key(col);
            !known.contains(&key) || !matched.insert(key)
        })
        .cloned()
        .collect();
    let missing_strand_rows = sheet
        .rows
        .iter()
        .filter(|row| row.strand_label().is_none())
        .map(|row| row.row_number)
        .collect();

    let mut report = DiscrepancyReport {
        missing_questions,
        extra_questions,
        missing_strand_rows,
        error: String::new(),
    };
    report.error = report.summarize();

    tracing::debug!(
        policy = ?policy,
        missing = report.missing_questions.len(),
        extra = report.extra_questions.len(),
        missing_strand = report.missing_strand_rows.len(),
        "reconciled dataset"
    );
    report
}
