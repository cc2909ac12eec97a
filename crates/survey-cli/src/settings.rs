//! Persisted settings and the stored session token.
//!
//! Both live in the platform config directory unless `--config` names a
//! settings file, in which case the session file sits next to it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use survey_ingest::MatchPolicy;
use survey_state::{ApiConfig, DEFAULT_PAGE_SIZE, SessionToken};

const APP_QUALIFIER: &str = "org";
const APP_ORG: &str = "survey-admin";
const APP_NAME: &str = "Survey Admin";
const CONFIG_FILENAME: &str = "settings.toml";
const SESSION_FILENAME: &str = "session.toml";

// =============================================================================
// SETTINGS
// =============================================================================

/// User settings, serialized to TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub table: TableSettings,
    pub ingest: IngestSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    /// Rows per results page.
    pub page_size: usize,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Treat `&` as `and` and collapse whitespace when matching questions.
    pub lenient_matching: bool,
    /// Accepted rows shown after a check.
    pub preview_rows: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            lenient_matching: false,
            preview_rows: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Lifetime of a stored token.
    pub ttl_secs: i64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

impl Settings {
    /// Default settings file path, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
    }

    /// Loads settings from `path`. A missing or unreadable file yields the
    /// defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    tracing::debug!(path = %path.display(), "loaded settings");
                    settings
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "invalid settings file, using defaults");
                    Self::default()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "unreadable settings file, using defaults");
                Self::default()
            }
        }
    }

    /// Writes settings to `path`, creating the parent directory.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("serialize settings")?;
        fs::write(path, content).with_context(|| format!("write settings {}", path.display()))
    }

    /// Client configuration, with `api_url` taking precedence over the file.
    pub fn api_config(&self, api_url: Option<&str>) -> ApiConfig {
        ApiConfig {
            base_url: api_url.unwrap_or(&self.api.base_url).to_string(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }

    /// Question matching policy, with the command-line flags taking
    /// precedence.
    pub fn match_policy(&self, lenient: bool, strict: bool) -> MatchPolicy {
        if lenient || (self.ingest.lenient_matching && !strict) {
            MatchPolicy::Lenient
        } else {
            MatchPolicy::Strict
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session.ttl_secs.max(0))
    }
}

// =============================================================================
// SESSION FILE
// =============================================================================

/// Session file path for a given settings file.
pub fn session_path(settings_path: &Path) -> PathBuf {
    settings_path.with_file_name(SESSION_FILENAME)
}

/// Reads the stored token, if any.
pub fn load_session(path: &Path) -> Option<SessionToken> {
    let content = fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(token) => Some(token),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "ignoring unreadable session file");
            None
        }
    }
}

pub fn save_session(path: &Path, token: &SessionToken) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create session directory {}", parent.display()))?;
    }
    let content = toml::to_string(token).context("serialize session")?;
    fs::write(path, content).with_context(|| format!("write session {}", path.display()))
}

/// Removes the stored token. A missing file is not an error.
pub fn clear_session(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(error) if error.kind() != std::io::ErrorKind::NotFound => {
            Err(error).with_context(|| format!("remove session {}", path.display()))
        }
        _ => Ok(()),
    }
}
