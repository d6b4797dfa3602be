use serde::{Deserialize, Serialize};
use std::path::Path;
use std::{env, fs};

use crate::error::ConfigError;

/// Editor mount settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// DOM id the editor engine mounts into.
    pub mount_id: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            mount_id: "honest-editor".into(),
        }
    }
}

/// Image upload endpoint handed to the editor engine.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    pub url: String,
    pub require_auth: bool,
    /// Header the bearer token is sent in.
    pub token_key: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            url: "https://honest.cash/api/upload/image".into(),
            require_auth: true,
            token_key: "x-auth-token".into(),
        }
    }
}

/// Thresholds for the save validation gates.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_body_chars: usize,
    pub min_title_chars: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_body_chars: 50,
            min_title_chars: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub editor: EditorConfig,
    pub upload: UploadConfig,
    pub validation: ValidationConfig,
}

impl Config {
    /// Load a TOML config file, substituting `$VAR` references from the
    /// environment before parsing.
    pub fn load(config_file: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = config_file.as_ref();
        let config_string = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&substitute_env(config_string, env::vars())).map_err(
            |source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
        )?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(s)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.editor.mount_id.is_empty() {
            return Err(ConfigError::Invalid {
                field: "editor.mount_id",
                message: "must not be empty".into(),
            });
        }
        if self.upload.require_auth && self.upload.token_key.is_empty() {
            return Err(ConfigError::Invalid {
                field: "upload.token_key",
                message: "required when upload.require_auth is set".into(),
            });
        }
        Ok(())
    }
}

// Longest names first so `$HOME_DIR` is not clobbered by `$HOME`.
fn substitute_env(mut s: String, vars: impl IntoIterator<Item = (String, String)>) -> String {
    let mut vars: Vec<_> = vars.into_iter().collect();
    vars.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    for (k, v) in vars {
        s = s.replace(&format!("${}", k), &v);
    }
    s
}
