//! Error types for backend calls and client state.

use survey_ingest::{DiscrepancyReport, Rejection};
use survey_model::{DatasetId, QuestionSetId};
use thiserror::Error;

/// Errors raised by the backend client and the selection state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    // === Session Errors ===
    /// No token is held.
    #[error("not signed in")]
    Unauthenticated,

    /// The held token outlived its lifetime and was cleared.
    #[error("session expired, please sign in again")]
    SessionExpired,

    // === Server Errors ===
    /// The name is already used by another entity (HTTP 409).
    #[error("{message}")]
    NameConflict { name: String, message: String },

    /// The server rejected a dataset import with a discrepancy report.
    #[error("{}", .0.error)]
    Discrepancy(DiscrepancyReport),

    /// Any other non-success response; `message` is the server's own text.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The client could not be configured.
    #[error("invalid client configuration: {0}")]
    Config(String),

    // === Selection Errors ===
    /// The question set is not in the loaded collection.
    #[error("question set {0} is not loaded")]
    UnknownQuestionSet(QuestionSetId),

    /// The dataset is not part of the selected question set.
    #[error("dataset {0} does not belong to the selected question set")]
    DatasetNotSelectable(DatasetId),
}

impl StateError {
    /// Returns a user-friendly error message suitable for display.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Please sign in first.".to_string(),
            Self::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            Self::NameConflict { message, .. } | Self::Server { message, .. } => message.clone(),
            Self::Discrepancy(report) => report.error.clone(),
            Self::Network(_) => {
                "Could not reach the server. Please check your connection.".to_string()
            }
            Self::Decode(_) | Self::Config(_) => "An unexpected error occurred.".to_string(),
            Self::UnknownQuestionSet(_) | Self::DatasetNotSelectable(_) => self.to_string(),
        }
    }
}

impl From<reqwest::Error> for StateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<StateError> for Rejection {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NameConflict { name, message } => Rejection::NameConflict {
                name,
                error: message,
            },
            StateError::Discrepancy(report) => Rejection::ReconciliationMismatch(report),
            StateError::Server { message, .. } => Rejection::SubmissionError { message },
            other => Rejection::SubmissionError {
                message: other.user_message(),
            },
        }
    }
}

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_conflict_maps_to_its_own_rejection() {
        let err = StateError::NameConflict {
            name: "Batch A".to_string(),
            message: "A dataset with this name already exists.".to_string(),
        };
        assert_eq!(
            Rejection::from(err),
            Rejection::NameConflict {
                name: "Batch A".to_string(),
                error: "A dataset with this name already exists.".to_string()
            }
        );
    }

    #[test]
    fn test_server_message_passes_through_verbatim() {
        let err = StateError::Server {
            status: 400,
            message: "No questions found for this question set".to_string(),
        };
        assert_eq!(err.to_string(), "No questions found for this question set");
        assert_eq!(
            Rejection::from(err),
            Rejection::SubmissionError {
                message: "No questions found for this question set".to_string()
            }
        );
    }

    #[test]
    fn test_session_expired_message() {
        assert_eq!(
            StateError::SessionExpired.user_message(),
            "Your session has expired. Please sign in again."
        );
    }
}
