//! Datasets and respondent records.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ids::{DatasetId, QuestionSetId, RecordId};
use crate::strand::Strand;

/// Activation status of a dataset.
///
/// At most one dataset is `Active` across the whole system. The server owns
/// that invariant; clients only read it back.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetStatus {
    Active,
    #[default]
    Inactive,
}

impl DatasetStatus {
    /// Wire and display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An imported batch of respondent records scored against one question set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(rename = "data_set_id")]
    pub id: DatasetId,
    /// Unique across the system.
    #[serde(rename = "data_set_name")]
    pub name: String,
    #[serde(rename = "data_set_description", default)]
    pub description: Option<String>,
    /// Referenced (not owned) question set.
    pub question_set_id: QuestionSetId,
    #[serde(default, deserialize_with = "status_or_default")]
    pub status: DatasetStatus,
    #[serde(default, with = "crate::timestamp::option")]
    pub created_at: Option<NaiveDateTime>,
    /// Number of records in the dataset.
    #[serde(default, rename = "rows")]
    pub row_count: usize,
    #[serde(default)]
    pub best_k: Option<u32>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

fn status_or_default<'de, D>(deserializer: D) -> Result<DatasetStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<DatasetStatus>::deserialize(deserializer)?.unwrap_or_default())
}

impl Dataset {
    /// Whether the server reports this dataset as the active one.
    pub fn is_active(&self) -> bool {
        self.status == DatasetStatus::Active
    }

    /// Description or an empty string.
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

/// A respondent record belonging to one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "data_id")]
    pub id: RecordId,
    #[serde(rename = "data_set_id")]
    pub dataset_id: DatasetId,
    /// Strand label as stored; unrecognized labels are kept verbatim.
    pub strand: String,
    #[serde(default)]
    pub stem_score: f64,
    #[serde(default)]
    pub abm_score: f64,
    #[serde(default)]
    pub humss_score: f64,
}

impl Record {
    /// Parsed strand label, if recognized.
    pub fn strand_label(&self) -> Option<Strand> {
        Strand::parse(&self.strand)
    }

    /// Sub-score for the given strand.
    pub fn score(&self, strand: Strand) -> f64 {
        match strand {
            Strand::Stem => self.stem_score,
            Strand::Abm => self.abm_score,
            Strand::Humss => self.humss_score,
        }
    }
}
