use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

static DEFAULT_DB_NAME: &str = "punchlist.sqlite3";
static SESSION_FILE_NAME: &str = "session.json";
static ENV_DATA_DIR: &str = "PUNCHLIST_DATA_DIR";
static ENV_REMOTE_URL: &str = "PUNCHLIST_REMOTE_URL";
static ENV_REMOTE_KEY: &str = "PUNCHLIST_REMOTE_KEY";
static ENV_PASSWORD: &str = "PUNCHLIST_PASSWORD";
static DEV_FALLBACK_PASSWORD: &str = "test123";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "punchlist", "punchlist"));

/// Where tasks are persisted. Chosen once at startup and handed to
/// [`crate::store::open_store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Local { db_path: PathBuf },
    Remote { url: String, api_key: String },
}

impl Backend {
    /// Remote when both url and key are present and non-blank, local otherwise.
    pub fn resolve(url: Option<String>, api_key: Option<String>, db_path: PathBuf) -> Self {
        let url = url.filter(|value| !value.trim().is_empty());
        let api_key = api_key.filter(|value| !value.trim().is_empty());
        match (url, api_key) {
            (Some(url), Some(api_key)) => Backend::Remote { url, api_key },
            _ => Backend::Local { db_path },
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Backend::Local { .. } => "local (this device only)",
            Backend::Remote { .. } => "remote (synced)",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    session_path: PathBuf,
    backend: Backend,
    password: Option<String>,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory using the provided override,
    /// environment variables, and platform defaults. Backend and password come from the
    /// environment.
    pub fn discover(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }

        let backend = Backend::resolve(
            env::var(ENV_REMOTE_URL).ok(),
            env::var(ENV_REMOTE_KEY).ok(),
            data_dir.join(DEFAULT_DB_NAME),
        );
        let password = resolve_password(env::var(ENV_PASSWORD).ok());
        Ok(Self::from_parts(data_dir, backend, password))
    }

    /// Construct [`AppConfig`] with a local backend inside `data_dir`.
    pub fn from_data_dir(data_dir: PathBuf, password: Option<String>) -> Self {
        let backend = Backend::Local {
            db_path: data_dir.join(DEFAULT_DB_NAME),
        };
        Self::from_parts(data_dir, backend, password)
    }

    pub fn from_parts(data_dir: PathBuf, backend: Backend, password: Option<String>) -> Self {
        let session_path = data_dir.join(SESSION_FILE_NAME);
        Self {
            data_dir,
            session_path,
            backend,
            password,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

/// Blank passwords count as unset. Debug builds fall back to a fixed development password.
fn resolve_password(configured: Option<String>) -> Option<String> {
    match configured.filter(|value| !value.trim().is_empty()) {
        Some(password) => Some(password),
        None if cfg!(debug_assertions) => Some(DEV_FALLBACK_PASSWORD.to_string()),
        None => None,
    }
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if cfg!(debug_assertions) {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let dev_dir = manifest_dir.join("..").join("tmp").join("dev-punchlist");
        return Ok(dev_dir);
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".punchlist"));
    }

    Ok(env::current_dir()?.join(".punchlist"))
}
