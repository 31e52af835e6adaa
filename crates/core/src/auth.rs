//! Shared-password gate with a file-backed session.
//!
//! Everyone who knows the configured password sees the same list. A
//! successful login writes a session file next to the data that stays valid
//! for 24 hours.

use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

use crate::config::AppConfig;

const SESSION_TTL_HOURS: i64 = 24;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No password configured. Set PUNCHLIST_PASSWORD to unlock the list.")]
    NoPasswordConfigured,

    #[error("Wrong password")]
    WrongPassword,

    #[error("Not logged in (or session expired). Run `punchlist login` first.")]
    NotLoggedIn,

    #[error("session file error: {0}")]
    Io(#[from] io::Error),

    #[error("session encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct Auth {
    password: Option<String>,
    session_path: PathBuf,
}

impl Auth {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            password: config.password().map(str::to_string),
            session_path: config.session_path().to_path_buf(),
        }
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Plain comparison against the configured password.
    pub fn verify_password(&self, candidate: &str) -> Result<bool, AuthError> {
        match &self.password {
            Some(configured) => Ok(candidate == configured),
            None => {
                tracing::error!("no password configured");
                Err(AuthError::NoPasswordConfigured)
            }
        }
    }

    pub fn login(&self, candidate: &str) -> Result<Session, AuthError> {
        if !self.verify_password(candidate)? {
            return Err(AuthError::WrongPassword);
        }
        self.create_session(Utc::now())
    }

    pub fn create_session(&self, now: DateTime<Utc>) -> Result<Session, AuthError> {
        let session = Session {
            session_id: Ulid::new().to_string(),
            expires_at: now + Duration::hours(SESSION_TTL_HOURS),
        };
        fs::write(&self.session_path, serde_json::to_vec(&session)?)?;
        tracing::info!(expires_at = %session.expires_at, "session created");
        Ok(session)
    }

    pub fn has_valid_session(&self) -> bool {
        self.valid_session_at(Utc::now()).is_some()
    }

    /// The stored session if it is still valid at `now`. Expired sessions are removed.
    pub fn valid_session_at(&self, now: DateTime<Utc>) -> Option<Session> {
        let raw = fs::read(&self.session_path).ok()?;
        let session: Session = serde_json::from_slice(&raw).ok()?;
        if session.is_valid_at(now) {
            Some(session)
        } else {
            tracing::info!("session expired");
            self.logout();
            None
        }
    }

    /// Gate for every task command: a password must be configured and a session must be live.
    pub fn require_session(&self) -> Result<Session, AuthError> {
        if !self.has_password() {
            return Err(AuthError::NoPasswordConfigured);
        }
        self.valid_session_at(Utc::now())
            .ok_or(AuthError::NotLoggedIn)
    }

    pub fn logout(&self) {
        match fs::remove_file(&self.session_path) {
            Ok(()) => tracing::info!("logged out"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(error = %err, "failed to remove session file"),
        }
    }
}
