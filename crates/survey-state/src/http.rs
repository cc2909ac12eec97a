//! JSON-over-HTTP backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use survey_ingest::DiscrepancyReport;
use survey_model::{
    AssessmentResult, CurrentUser, Dataset, DatasetId, Question, QuestionSet, QuestionSetId,
    Record,
};

use crate::backend::{
    Backend, Credentials, DatasetImport, DatasetUpdate, NewQuestionSet, QuestionSetUpdate,
};
use crate::error::{Result, StateError};
use crate::session::{SharedSession, lock};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL without trailing slash, e.g. `http://localhost:5000`.
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Backend talking to the server over HTTP with a bearer token from the
/// shared session.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    session: SharedSession,
}

impl HttpBackend {
    /// Creates a backend bound to `session`.
    pub fn new(config: &ApiConfig, session: SharedSession) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(StateError::Config(format!(
                "base URL must start with http:// or https://, got '{base_url}'"
            )));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StateError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(USER_AGENT, concat!("survey-admin/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/json")
    }

    /// Attaches the bearer token. Fails without sending when signed out or
    /// expired.
    fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = lock(&self.session).bearer()?;
        Ok(self
            .request(method, path)
            .header(AUTHORIZATION, format!("Bearer {token}")))
    }

    /// Sends a request and turns non-success statuses into errors.
    /// `conflict_name` is reported when the server answers 409.
    async fn send(&self, request: RequestBuilder, conflict_name: Option<&str>) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await?;
        tracing::debug!(%status, path = %url, bytes = body.len(), "response");

        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_failure(status, &body, conflict_name))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.send(self.authorized(Method::GET, path)?, None).await?;
        decode(&body)
    }

    async fn write<B: serde::Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        conflict_name: Option<&str>,
    ) -> Result<()> {
        let mut request = self.authorized(method, path)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request, conflict_name).await.map(|_| ())
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| StateError::Decode(e.to_string()))
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    missing_questions: Option<Vec<String>>,
    #[serde(default)]
    extra_questions: Option<Vec<String>>,
    #[serde(default)]
    missing_strand_rows: Option<Vec<usize>>,
}

impl ErrorBody {
    fn has_discrepancies(&self) -> bool {
        self.missing_questions.is_some()
            || self.extra_questions.is_some()
            || self.missing_strand_rows.is_some()
    }
}

/// Maps a failed response to an error, passing the server's message through.
pub(crate) fn classify_failure(
    status: StatusCode,
    body: &str,
    conflict_name: Option<&str>,
) -> StateError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error
        .clone()
        .or_else(|| parsed.message.clone())
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| match body.trim() {
            "" => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            text => text.to_string(),
        });

    if status == StatusCode::CONFLICT {
        return StateError::NameConflict {
            name: conflict_name.unwrap_or_default().to_string(),
            message,
        };
    }
    if parsed.has_discrepancies() {
        return StateError::Discrepancy(DiscrepancyReport {
            missing_questions: parsed.missing_questions.unwrap_or_default(),
            extra_questions: parsed.extra_questions.unwrap_or_default(),
            missing_strand_rows: parsed.missing_strand_rows.unwrap_or_default(),
            error: message,
        });
    }
    StateError::Server {
        status: status.as_u16(),
        message,
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
impl Backend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<String> {
        let request = self.request(Method::POST, "/login").json(credentials);
        let body = self.send(request, None).await?;
        let response: LoginResponse = decode(&body)?;
        match response.token {
            Some(token) if response.success => Ok(token),
            _ => Err(StateError::Server {
                status: StatusCode::UNAUTHORIZED.as_u16(),
                message: response
                    .message
                    .unwrap_or_else(|| "login failed".to_string()),
            }),
        }
    }

    async fn current_user(&self) -> Result<CurrentUser> {
        self.get("/me").await
    }

    async fn question_sets(&self) -> Result<Vec<QuestionSet>> {
        self.get("/question-sets").await
    }

    async fn questions(&self, set: QuestionSetId) -> Result<Vec<Question>> {
        self.get(&format!("/question-sets/{set}/questions")).await
    }

    async fn create_question_set(&self, request: &NewQuestionSet) -> Result<()> {
        self.write(
            Method::POST,
            "/question-sets",
            Some(request),
            Some(&request.question_set_name),
        )
        .await
    }

    async fn update_question_set(
        &self,
        set: QuestionSetId,
        update: &QuestionSetUpdate,
    ) -> Result<()> {
        self.write(
            Method::PUT,
            &format!("/question-sets/{set}"),
            Some(update),
            Some(&update.question_set_name),
        )
        .await
    }

    async fn delete_question_set(&self, set: QuestionSetId) -> Result<()> {
        self.write::<()>(Method::DELETE, &format!("/question-sets/{set}"), None, None)
            .await
    }

    async fn datasets(&self) -> Result<Vec<Dataset>> {
        self.get("/datasets").await
    }

    async fn import_dataset(&self, request: &DatasetImport) -> Result<()> {
        self.write(
            Method::POST,
            "/import_dataset",
            Some(request),
            Some(&request.dataset_name),
        )
        .await
    }

    async fn update_dataset(&self, dataset: DatasetId, update: &DatasetUpdate) -> Result<()> {
        self.write(
            Method::PUT,
            &format!("/datasets/{dataset}"),
            Some(update),
            Some(&update.data_set_name),
        )
        .await
    }

    async fn delete_dataset(&self, dataset: DatasetId) -> Result<()> {
        self.write::<()>(Method::DELETE, &format!("/datasets/{dataset}"), None, None)
            .await
    }

    async fn records(&self, dataset: DatasetId) -> Result<Vec<Record>> {
        self.get(&format!("/datasets/{dataset}/records")).await
    }

    async fn activate(&self, dataset: DatasetId) -> Result<()> {
        let body = serde_json::json!({ "status": "Active" });
        self.write(Method::PUT, &format!("/activate/{dataset}"), Some(&body), None)
            .await
    }

    async fn results(&self) -> Result<Vec<AssessmentResult>> {
        self.get("/results/").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, shared};

    #[test]
    fn test_conflict_is_name_conflict() {
        let err = classify_failure(
            StatusCode::CONFLICT,
            r#"{"error": "A dataset with this name already exists."}"#,
            Some("Batch A"),
        );
        assert_eq!(
            err,
            StateError::NameConflict {
                name: "Batch A".to_string(),
                message: "A dataset with this name already exists.".to_string()
            }
        );
    }

    #[test]
    fn test_conflict_text_is_not_inferred() {
        let err = classify_failure(
            StatusCode::BAD_REQUEST,
            r#"{"error": "Course already exists"}"#,
            Some("Batch A"),
        );
        assert!(matches!(err, StateError::Server { status: 400, .. }));
    }

    #[test]
    fn test_discrepancy_payload() {
        let err = classify_failure(
            StatusCode::BAD_REQUEST,
            r#"{"error": "Import failed due to missing questions or Strand values.",
                "missing_questions": ["enjoys algebra"]}"#,
            None,
        );
        let StateError::Discrepancy(report) = err else {
            panic!("expected discrepancy report");
        };
        assert_eq!(report.missing_questions, vec!["enjoys algebra"]);
        assert!(report.missing_strand_rows.is_empty());
    }

    #[test]
    fn test_message_fallbacks() {
        let err = classify_failure(StatusCode::BAD_REQUEST, r#"{"message": "Invalid OTP"}"#, None);
        assert_eq!(err.to_string(), "Invalid OTP");

        let err = classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom", None);
        assert_eq!(err.to_string(), "boom");

        let err = classify_failure(StatusCode::NOT_FOUND, "", None);
        assert_eq!(err.to_string(), "Not Found");
    }

    #[test]
    fn test_base_url_is_validated() {
        let session = shared(Session::default());
        assert!(matches!(
            HttpBackend::new(&ApiConfig::new("localhost:5000"), session.clone()),
            Err(StateError::Config(_))
        ));
        let backend = HttpBackend::new(&ApiConfig::new("http://localhost:5000/"), session).unwrap();
        assert_eq!(backend.url("/datasets"), "http://localhost:5000/datasets");
    }

    #[tokio::test]
    async fn test_signed_out_request_is_not_sent() {
        let backend =
            HttpBackend::new(&ApiConfig::new("http://127.0.0.1:9"), shared(Session::default()))
                .unwrap();
        assert_eq!(backend.datasets().await, Err(StateError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_expired_session_is_cleared_before_sending() {
        let session = shared(Session::new(chrono::Duration::zero()));
        let issued_at = chrono::Utc::now() - chrono::Duration::seconds(1);
        crate::session::lock(&session).begin_at("stale", issued_at);
        let backend =
            HttpBackend::new(&ApiConfig::new("http://127.0.0.1:9"), session.clone()).unwrap();

        assert_eq!(backend.results().await, Err(StateError::SessionExpired));
        assert!(crate::session::lock(&session).stored_token().is_none());
    }
}
