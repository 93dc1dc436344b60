//! Sign-in against the catalog's users table and the on-disk session.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::project_dirs;
use crate::gateway::{GatewayError, RestClient, send_request};

const SESSION_FILE: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Tên đăng nhập hoặc mật khẩu không đúng")]
    InvalidCredentials,
    #[error("Lỗi hệ thống: {0}")]
    System(String),
}

impl From<GatewayError> for AuthError {
    fn from(err: GatewayError) -> Self {
        AuthError::System(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct UserRow {
    username: String,
    #[serde(default)]
    name: Option<String>,
}

impl From<UserRow> for UserSession {
    fn from(row: UserRow) -> Self {
        let display_name = row
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| row.username.clone());
        Self {
            username: row.username,
            display_name,
        }
    }
}

/// Query parameters for the credential lookup. Kept separate so the request
/// shape can be tested without a server.
fn credential_params(username: &str, password: &str) -> Vec<(String, String)> {
    vec![
        ("select".to_string(), "username,name".to_string()),
        ("username".to_string(), format!("eq.{username}")),
        ("password".to_string(), format!("eq.{password}")),
        ("limit".to_string(), "1".to_string()),
    ]
}

pub async fn authenticate(
    client: &RestClient,
    users_table: &str,
    username: &str,
    password: &str,
) -> Result<UserSession, AuthError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }
    let params = credential_params(username, password);
    let (result, _) = send_request("Authenticate", || {
        client.select::<UserRow>(users_table, &params, false)
    })
    .await;
    let selected = result.inspect_err(|err| warn!(error = %err, "Sign-in lookup failed"))?;
    match selected.rows.into_iter().next() {
        Some(row) => {
            let session = UserSession::from(row);
            info!(username = %session.username, "Signed in");
            Ok(session)
        }
        None => {
            debug!(username, "No matching user");
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Persists the signed-in user between runs. There is no expiry; `logout`
/// removes the file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The store under the platform data directory.
    pub fn default_location() -> Option<Self> {
        project_dirs().map(|dirs| Self::new(dirs.data_dir().join(SESSION_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, session: &UserSession) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)
    }

    /// A missing or unreadable file means nobody is signed in.
    pub fn load(&self) -> Option<UserSession> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(session) => Some(session),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Ignoring corrupt session file");
                None
            }
        }
    }

    /// Returns whether a session was removed.
    pub fn clear(&self) -> std::io::Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}
