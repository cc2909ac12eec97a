//! The signed-in administrator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Payload of the current-user endpoint.
///
/// Only the fields the admin tool displays are typed; anything else the
/// server sends is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(default, alias = "user_id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "full_name")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CurrentUser {
    /// Best label for display: name, then email, then id.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.email.clone())
            .or_else(|| self.id.map(|id| format!("user {id}")))
            .unwrap_or_else(|| "unknown user".to_string())
    }
}
