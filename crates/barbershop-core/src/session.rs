// Signed-in identity, passed explicitly into the editor and the stores.
//
// The identity provider itself is external; this module only records who is
// signed in and remembers it between runs in `session.toml` under the
// platform data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::model::UserId;

const SESSION_FILE: &str = "session.toml";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),

    #[error("failed to access session file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse session file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize session: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no home directory available for session storage")]
    NoDataDir,
}

/// The authenticated user for the current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    /// Bearer token issued by the hosted identity provider, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Session {
    /// Build a session for a locally entered email address. The user id is
    /// the normalized (trimmed, lowercased) address, so it stays stable
    /// across runs.
    pub fn from_email(email: &str) -> Result<Self, SessionError> {
        let normalized = email.trim().to_lowercase();
        let valid = normalized
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid || normalized.chars().any(char::is_whitespace) {
            return Err(SessionError::InvalidEmail(email.trim().to_string()));
        }
        Ok(Session {
            user_id: UserId::new(format!("user:{normalized}")),
            email: normalized,
            access_token: None,
        })
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }
}

/// File-backed persistence for the last signed-in session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store the session file in `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        SessionStore {
            path: dir.join(SESSION_FILE),
        }
    }

    /// Store the session file in the platform data directory
    /// (e.g. `~/.local/share/barbershop`).
    pub fn platform_default() -> Result<Self, SessionError> {
        let dirs = directories::ProjectDirs::from("", "", "barbershop").ok_or(SessionError::NoDataDir)?;
        Ok(Self::in_dir(dirs.data_dir()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the remembered session. A missing file means signed out.
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored session");
                return Ok(None);
            }
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let session = toml::from_str(&text).map_err(|source| SessionError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SessionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = toml::to_string(session)?;
        std::fs::write(&self.path, text).map_err(|source| SessionError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!(email = %session.email, "Session stored");
        Ok(())
    }

    /// Forget the stored session. Clearing an absent session is fine.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
