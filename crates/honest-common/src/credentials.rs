//! Process-wide credential lookup used to authorize editor uploads.
//!
//! The upload token lives under `HC_USER_TOKEN`. Older clients stored the
//! whole credential object as JSON under `HC_USER_CREDENTIALS` instead, so the
//! `token` field of that object is the fallback.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::CredentialError;

pub const USER_TOKEN_KEY: &str = "HC_USER_TOKEN";
pub const USER_CREDENTIALS_KEY: &str = "HC_USER_CREDENTIALS";

/// A key-value credential lookup.
pub trait CredentialStore {
    fn get(&self, key: &str) -> Option<String>;

    /// Resolve the upload token.
    fn user_token(&self) -> Option<String> {
        if let Some(token) = self.get(USER_TOKEN_KEY).filter(|t| !t.is_empty()) {
            return Some(token);
        }
        let raw = self.get(USER_CREDENTIALS_KEY)?;
        match serde_json::from_str::<StoredCredentials>(&raw) {
            Ok(creds) => creds.token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed {}", USER_CREDENTIALS_KEY);
                None
            }
        }
    }
}

#[derive(Deserialize)]
struct StoredCredentials {
    token: Option<String>,
}

/// In-memory credential store.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    entries: HashMap<String, String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

/// Reads credentials from process environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialStore;

impl CredentialStore for EnvCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A JSON object of string values read from disk.
///
/// The file is read once at construction; later changes on disk are not seen.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FileCredentialStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let path = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path).map_err(|source| CredentialError::Read {
            path: path.clone(),
            source,
        })?;
        let entries =
            serde_json::from_str(&contents).map_err(|source| CredentialError::Format {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

/// An absent store has no credentials.
impl<T: CredentialStore> CredentialStore for Option<T> {
    fn get(&self, key: &str) -> Option<String> {
        self.as_ref()?.get(key)
    }
}

/// Checks `primary` first, then `fallback`.
#[derive(Debug, Clone, Default)]
pub struct Layered<A, B> {
    pub primary: A,
    pub fallback: B,
}

impl<A: CredentialStore, B: CredentialStore> CredentialStore for Layered<A, B> {
    fn get(&self, key: &str) -> Option<String> {
        self.primary.get(key).or_else(|| self.fallback.get(key))
    }

    fn user_token(&self) -> Option<String> {
        self.primary
            .user_token()
            .or_else(|| self.fallback.user_token())
    }
}
