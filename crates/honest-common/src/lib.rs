//! Shared plumbing for the honest editor crates: configuration, credential
//! lookup, error types, and telemetry setup.

pub mod config;
pub mod credentials;
pub mod error;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use crate::config::{Config, EditorConfig, UploadConfig, ValidationConfig};
pub use crate::credentials::{
    CredentialStore, EnvCredentialStore, FileCredentialStore, Layered, MemoryCredentialStore,
};
pub use crate::error::{ConfigError, CredentialError, HonestError};
