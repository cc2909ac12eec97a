//! Question sets and their questions.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ids::{QuestionId, QuestionSetId};
use crate::strand::Strand;

/// A named survey instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSet {
    #[serde(rename = "question_set_id")]
    pub id: QuestionSetId,
    /// Unique display name.
    #[serde(rename = "question_set_name")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "crate::timestamp::option")]
    pub created_at: Option<NaiveDateTime>,
    /// Number of questions owned by the set, as reported by the server.
    #[serde(default, alias = "questions_count")]
    pub question_count: usize,
}

impl QuestionSet {
    /// Description or an empty string.
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

/// A single question of a question set.
///
/// The strand is kept as the server sent it; use [`Question::strand_label`]
/// for the parsed form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question_id")]
    pub id: QuestionId,
    #[serde(rename = "question_text")]
    pub text: String,
    pub strand: String,
}

impl Question {
    /// Parsed strand label, if recognized.
    pub fn strand_label(&self) -> Option<Strand> {
        Strand::parse(&self.strand)
    }
}
