//! Assessment results.
//!
//! Results come from the external classification service. Neighbour distances
//! and tie weights are carried through untouched; nothing here recomputes them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ids::{DatasetId, ResultId};
use crate::strand::Strand;

/// Respondent details attached to a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Respondent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Dataset the result was classified against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultDataset {
    #[serde(default, alias = "data_set_id")]
    pub id: Option<DatasetId>,
    #[serde(default, alias = "data_set_name")]
    pub name: Option<String>,
    #[serde(default, with = "crate::timestamp::option")]
    pub created_at: Option<NaiveDateTime>,
}

/// A classification result for one respondent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    #[serde(rename = "results_id")]
    pub id: ResultId,
    pub recommended_strand: String,
    #[serde(default)]
    pub tie: bool,
    #[serde(default)]
    pub stem_score: f64,
    #[serde(default)]
    pub abm_score: f64,
    #[serde(default)]
    pub humss_score: f64,
    #[serde(default)]
    pub user_data: Respondent,
    #[serde(default)]
    pub dataset: Option<ResultDataset>,
    #[serde(default)]
    pub neighbors: Vec<serde_json::Value>,
    #[serde(default)]
    pub tie_info: Option<serde_json::Value>,
}

impl AssessmentResult {
    /// Parsed recommended strand, if recognized.
    pub fn strand_label(&self) -> Option<Strand> {
        Strand::parse(&self.recommended_strand)
    }

    /// Name of the dataset the result belongs to.
    pub fn dataset_name(&self) -> Option<&str> {
        self.dataset.as_ref().and_then(|d| d.name.as_deref())
    }

    /// Id of the dataset the result belongs to, when the server sent it.
    pub fn dataset_id(&self) -> Option<DatasetId> {
        self.dataset.as_ref().and_then(|d| d.id)
    }
}
