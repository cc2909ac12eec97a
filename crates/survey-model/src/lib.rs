//! Entity types shared by the ingestion pipeline and the selection state.
//!
//! Every type here mirrors the JSON payloads exchanged with the backend, so
//! field names on the wire follow the server (`data_set_id`,
//! `question_set_name`, ...) while the Rust side uses short names.
//!
//! # Module Organization
//!
//! - [`ids`]: Typed identifiers for every entity
//! - [`strand`]: The three classification labels and their long forms
//! - [`question_set`]: Question sets and their questions
//! - [`dataset`]: Datasets, activation status, and respondent records
//! - [`result`]: Assessment results produced by the external classifier
//! - [`user`]: The signed-in administrator
//! - [`timestamp`]: Lenient timestamp (de)serialization

pub mod dataset;
pub mod ids;
pub mod question_set;
pub mod result;
pub mod strand;
pub mod timestamp;
pub mod user;

pub use dataset::{Dataset, DatasetStatus, Record};
pub use ids::{DatasetId, QuestionId, QuestionSetId, RecordId, ResultId};
pub use question_set::{Question, QuestionSet};
pub use result::{AssessmentResult, ResultDataset, Respondent};
pub use strand::{ParseStrandError, Strand};
pub use user::CurrentUser;
