//! Signed-in session.
//!
//! A [`Session`] holds the bearer token and the user it belongs to. It is an
//! explicit object handed to the HTTP backend; nothing reads tokens from
//! globals. Tokens are dropped once their lifetime has passed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use survey_model::CurrentUser;

use crate::backend::{Backend, Credentials};
use crate::error::{Result, StateError};

/// Default token lifetime, matching the server's token expiry.
pub const DEFAULT_SESSION_TTL: Duration = Duration::seconds(3600);

/// A bearer token and when it was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

/// Session state: signed out, or holding a token.
#[derive(Debug, Clone)]
pub struct Session {
    ttl: Duration,
    token: Option<SessionToken>,
    user: Option<CurrentUser>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl Session {
    /// A signed-out session whose tokens live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            token: None,
            user: None,
        }
    }

    /// A session resumed from a stored token.
    pub fn resume(token: SessionToken, ttl: Duration) -> Self {
        Self {
            ttl,
            token: Some(token),
            user: None,
        }
    }

    /// Stores a freshly issued token.
    pub fn begin(&mut self, token: impl Into<String>) {
        self.begin_at(token, Utc::now());
    }

    pub fn begin_at(&mut self, token: impl Into<String>, now: DateTime<Utc>) {
        self.token = Some(SessionToken {
            token: token.into(),
            issued_at: now,
        });
        self.user = None;
    }

    /// Clears the token and user.
    pub fn end(&mut self) {
        self.token = None;
        self.user = None;
    }

    pub fn set_user(&mut self, user: CurrentUser) {
        self.user = Some(user);
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    /// Stored token, expired or not.
    pub fn stored_token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token.as_ref().map(|t| t.issued_at + self.ttl)
    }

    /// The bearer token for a request made now.
    pub fn bearer(&mut self) -> Result<String> {
        self.bearer_at(Utc::now())
    }

    /// The bearer token for a request made at `now`. An expired token is
    /// cleared and reported as [`StateError::SessionExpired`].
    pub fn bearer_at(&mut self, now: DateTime<Utc>) -> Result<String> {
        let Some(token) = &self.token else {
            return Err(StateError::Unauthenticated);
        };
        if now >= token.issued_at + self.ttl {
            tracing::info!(issued_at = %token.issued_at, "session token expired");
            self.end();
            return Err(StateError::SessionExpired);
        }
        Ok(token.token.clone())
    }
}

/// A session shared between the backend and its callers.
pub type SharedSession = Arc<Mutex<Session>>;

/// Wraps a session for sharing.
pub fn shared(session: Session) -> SharedSession {
    Arc::new(Mutex::new(session))
}

/// Locks a shared session, recovering from poisoning.
pub fn lock(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Signs in, stores the token, and loads the current user.
pub async fn login<B: Backend + ?Sized>(
    backend: &B,
    session: &SharedSession,
    credentials: &Credentials,
) -> Result<CurrentUser> {
    let token = backend.login(credentials).await?;
    lock(session).begin(token);
    let user = backend.current_user().await?;
    lock(session).set_user(user.clone());
    tracing::info!(user = %user.display_name(), "signed in");
    Ok(user)
}
