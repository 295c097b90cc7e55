//! Session storage
//!
//! The signed-in identity lives in an injected [`SessionStore`]. It is
//! populated when login or signup succeeds and cleared on logout (whether or
//! not the server call succeeds) and on any 401.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// A signed-in user and their tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// User record as returned by the identity service
    pub user: Value,
    /// Bearer token
    pub access_token: String,
    /// Refresh token, if issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Session for `user` with `access_token`
    pub fn new(user: Value, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Whether the access token is past its expiry
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }

    /// User email, when the user record carries one
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.user.get("email").and_then(Value::as_str)
    }
}

/// Owner of the current session
pub trait SessionStore: Send + Sync {
    /// Current session, if any
    fn get(&self) -> Option<Session>;
    /// Replace the current session
    fn set(&self, session: Session);
    /// Forget the current session
    fn clear(&self);
}

/// Process-local session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, session: Session) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    fn clear(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Session persisted as JSON on disk, so CLI invocations share a login
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    cached: MemorySessionStore,
}

impl FileSessionStore {
    /// Store backed by `path`; an unreadable file means "signed out"
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = MemorySessionStore::new();
        if let Some(session) = read_session(&path) {
            cached.set(session);
        }
        Self { path, cached }
    }

    /// Store at the platform data directory, `<data>/storefront/session.json`
    #[must_use]
    pub fn default_location() -> Option<Self> {
        dirs::data_local_dir().map(|dir| Self::new(dir.join("storefront").join("session.json")))
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<Session> {
        self.cached.get()
    }

    fn set(&self, session: Session) {
        if let Err(e) = write_session(&self.path, &session) {
            warn!(path = %self.path.display(), error = %e, "Failed to persist session");
        }
        self.cached.set(session);
    }

    fn clear(&self) {
        self.cached.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Session file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove session file"),
        }
    }
}

fn read_session(path: &Path) -> Option<Session> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(session) => Some(session),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable session file");
            None
        }
    }
}

fn write_session(path: &Path, session: &Session) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(session)?;
    std::fs::write(path, json)
}
