//! Backend access and client state for the survey admin tool.
//!
//! - [`backend`]: The [`Backend`] trait and its request bodies
//! - [`http`]: [`HttpBackend`], the REST implementation
//! - [`session`]: Bearer token lifetime and login
//! - [`selection`]: Question set / dataset selection with stale-response guards
//! - [`activation`]: Dataset activation with duplicate suppression
//! - [`dashboard`]: Async driver binding the selection state to a backend
//! - [`table`]: Sort, search, filter and pagination over entity tables
//! - [`import`]: Import forms and their submission
//! - [`fakes`]: In-memory backend

pub mod activation;
pub mod backend;
pub mod dashboard;
mod error;
pub mod fakes;
pub mod http;
pub mod import;
pub mod selection;
pub mod session;
pub mod table;

// === Error Types ===
pub use error::{Result, StateError};

// === Backend ===
pub use backend::{
    Backend, Credentials, DatasetImport, DatasetUpdate, NewQuestion, NewQuestionSet,
    QuestionSetUpdate,
};
pub use fakes::{Gate, GateKey, MemoryBackend};
pub use http::{ApiConfig, DEFAULT_TIMEOUT, HttpBackend};
pub use session::{DEFAULT_SESSION_TTL, Session, SessionToken, SharedSession, login};

// === State ===
pub use activation::{Activation, ActivationManager};
pub use dashboard::Dashboard;
pub use selection::{
    DistributionMode, QuestionsTicket, RecordsTicket, RefreshTicket, Selection, SelectionState,
    StrandDistribution,
};

// === Tables ===
pub use table::{
    DEFAULT_PAGE_SIZE, INDEX_KEY, ResultFilter, SortDirection, SortState, SortValue, TableRow,
    TableView,
};

// === Imports ===
pub use import::{DatasetForm, QuestionSetForm, Upload};
