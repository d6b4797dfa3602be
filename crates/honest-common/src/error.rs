//! Error types shared by the honest crates.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for configuration and credential handling.
#[derive(Debug, Error, Diagnostic)]
pub enum HonestError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Credentials(#[from] CredentialError),
}

/// Configuration loading errors
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    #[diagnostic(code(config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    #[diagnostic(
        code(config::parse),
        help("config files are TOML; `$VAR` references are substituted from the environment")
    )]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {message}")]
    #[diagnostic(code(config::invalid))]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Credential store errors
#[derive(Debug, Error, Diagnostic)]
pub enum CredentialError {
    #[error("failed to read credential file {}", path.display())]
    #[diagnostic(code(credentials::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential file {} is not a JSON object of strings", path.display())]
    #[diagnostic(code(credentials::format))]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
