//! The single persisted setting: the analysis API key.
//!
//! Read once at startup, written only by an explicit save, and handed to the
//! analysis call rather than read ambiently.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::APP_DIR_NAME;
use crate::error::{ErrorContext, XrayError, XrayResult};

/// Fixed slot the key lives under
pub const API_KEY_SLOT: &str = "paper_xray_api_key";

/// Secondary environment variable consulted after the configured one
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

pub trait CredentialStore {
    fn get(&self, key: &str) -> XrayResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> XrayResult<()>;
}

/// TOML key/value file, owner-readable only on Unix
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/paper-xray/credentials.toml`
    pub fn default_location() -> XrayResult<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| XrayError::configuration("no user config directory on this system"))?;
        Ok(Self::new(dir.join(APP_DIR_NAME).join("credentials.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> XrayResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path).with_path(&self.path)?;
        toml::from_str(&content).map_err(|e| {
            XrayError::configuration(format!("{} is not valid TOML: {}", self.path.display(), e))
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> XrayResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> XrayResult<()> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());

        let content = toml::to_string(&entries).map_err(|e| {
            XrayError::configuration(format!("Failed to serialize credentials: {}", e))
        })?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_path(parent)?;
        }
        std::fs::write(&self.path, content).with_path(&self.path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_path(&self.path)?;
        }

        Ok(())
    }
}

/// In-process store, for sessions that must not touch disk
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: BTreeMap<String, String>,
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> XrayResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> XrayResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// An API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Saved,
    Environment,
    Missing,
}

/// Process-wide credential state: the saved key and the environment default
#[derive(Debug, Clone, Default)]
pub struct CredentialState {
    saved: Option<String>,
    env_default: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl CredentialState {
    pub fn new(saved: Option<String>, env_default: Option<String>) -> Self {
        Self {
            saved: non_empty(saved),
            env_default: non_empty(env_default),
        }
    }

    /// Startup read: the stored slot, plus `env_var` (then `GEMINI_API_KEY`)
    pub fn load(store: &dyn CredentialStore, env_var: &str) -> XrayResult<Self> {
        let saved = store.get(API_KEY_SLOT)?;
        let env_default = std::env::var(env_var)
            .ok()
            .or_else(|| std::env::var(GEMINI_KEY_ENV).ok());
        let state = Self::new(saved, env_default);
        info!("API key source: {:?}", state.source());
        Ok(state)
    }

    /// Persist a new key; an empty string clears the saved key
    pub fn save(&mut self, store: &mut dyn CredentialStore, key: &str) -> XrayResult<()> {
        let key = key.trim();
        store.set(API_KEY_SLOT, key)?;
        self.saved = non_empty(Some(key.to_string()));
        info!("API key saved ({:?})", self.source());
        Ok(())
    }

    pub fn resolve(&self) -> Option<Credential> {
        self.saved
            .as_ref()
            .or(self.env_default.as_ref())
            .map(|key| Credential::new(key.clone()))
    }

    pub fn source(&self) -> CredentialSource {
        if self.saved.is_some() {
            CredentialSource::Saved
        } else if self.env_default.is_some() {
            CredentialSource::Environment
        } else {
            CredentialSource::Missing
        }
    }

    pub fn saved_key(&self) -> Option<&str> {
        self.saved.as_deref()
    }
}
