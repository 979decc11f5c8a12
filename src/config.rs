//! Environment-driven configuration.
//!
//! | Variable | Required | Default |
//! |---|---|---|
//! | `CIP_INSTANCE` | yes | |
//! | `CIP_CLIENT_ID` | yes | |
//! | `CIP_CLIENT_SECRET` | yes | |
//! | `CIP_ENDPOINT` | no | `https://<instance>/api/v1/query` |
//! | `CIP_TOKEN_URL` | no | `https://<instance>/oauth2/token` |
//! | `CIP_MAX_ROWS` | no | `1000` |
use std::{collections::HashMap, path::Path};

use thiserror::Error;

use crate::auth::Credentials;

pub const INSTANCE: &str = "CIP_INSTANCE";
pub const CLIENT_ID: &str = "CIP_CLIENT_ID";
pub const CLIENT_SECRET: &str = "CIP_CLIENT_SECRET";
pub const ENDPOINT: &str = "CIP_ENDPOINT";
pub const TOKEN_URL: &str = "CIP_TOKEN_URL";
pub const MAX_ROWS: &str = "CIP_MAX_ROWS";

pub const DEFAULT_MAX_ROWS: u32 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub credentials: Credentials,
    pub endpoint: String,
    pub token_url: String,
    pub max_rows: u32,
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `KEY=VALUE` lines from `path`. Variables already set in the process
    /// environment take precedence over the file.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = dotenvy::from_path_iter(path)?.collect::<Result<HashMap<_, _>, _>>()?;
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file.get(key).cloned()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let instance = require(INSTANCE)?;
        let credentials = Credentials {
            client_id: require(CLIENT_ID)?,
            client_secret: require(CLIENT_SECRET)?,
            instance: instance.clone(),
        };
        let max_rows = match get(MAX_ROWS) {
            Some(v) => v.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                key: MAX_ROWS,
                reason: e.to_string(),
            })?,
            None => DEFAULT_MAX_ROWS,
        };

        Ok(Self {
            endpoint: get(ENDPOINT).unwrap_or_else(|| format!("https://{instance}/api/v1/query")),
            token_url: get(TOKEN_URL).unwrap_or_else(|| format!("https://{instance}/oauth2/token")),
            credentials,
            max_rows,
        })
    }
}
