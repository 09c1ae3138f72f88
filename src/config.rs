// src/config.rs
//
// Runtime settings, built once at startup and passed by reference into each
// component. Nothing here is read from the environment after construction.

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_IMAGE_COLUMN, DEFAULT_LOCAL_ROOT, DEFAULT_TITLE_COLUMN, ENV_AZURE_ACCOUNT,
    ENV_AZURE_ACCOUNT_KEY, ENV_AZURE_CONTAINER, ENV_AZURE_PREFIX, ENV_AZURE_SAS_TOKEN,
    ENV_AZURE_STORAGE_ENDPOINT, ENV_IMAGE_COLUMN, ENV_LOCAL_ROOT,
};
use crate::error::HarvestError;

/// Everything the pipeline needs to run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Storage account name.
    pub account: String,
    /// Container holding the source objects.
    pub container: String,
    /// Path prefix scoping the listing; empty means the whole container.
    pub prefix: String,
    /// Base64 account signing key. Optional when `sas_token` is supplied.
    pub account_key: Option<String>,
    /// Pre-built access token used verbatim instead of signing fresh grants.
    pub sas_token: Option<String>,
    /// Endpoint override for emulators; `None` means the public endpoint.
    pub endpoint: Option<String>,
    /// Local root all artifacts land under.
    pub local_root: PathBuf,
    /// Name of the designated structured column in columnar inputs.
    pub image_column: String,
    /// Name of the column supplying the title metadata field.
    pub title_column: String,
}

impl Settings {
    /// Build settings from the process environment. Call `dotenvy::dotenv()`
    /// first if a `.env` file should participate.
    pub fn from_env() -> Result<Self, HarvestError> {
        let account = require(ENV_AZURE_ACCOUNT)?;
        let container = require(ENV_AZURE_CONTAINER)?;

        let settings = Settings {
            account,
            container,
            prefix: env::var(ENV_AZURE_PREFIX).unwrap_or_default(),
            account_key: optional(ENV_AZURE_ACCOUNT_KEY),
            sas_token: optional(ENV_AZURE_SAS_TOKEN),
            endpoint: optional(ENV_AZURE_STORAGE_ENDPOINT),
            local_root: env::var(ENV_LOCAL_ROOT)
                .unwrap_or_else(|_| DEFAULT_LOCAL_ROOT.to_string())
                .into(),
            image_column: env::var(ENV_IMAGE_COLUMN)
                .unwrap_or_else(|_| DEFAULT_IMAGE_COLUMN.to_string()),
            title_column: DEFAULT_TITLE_COLUMN.to_string(),
        };

        if settings.account_key.is_none() && settings.sas_token.is_none() {
            return Err(HarvestError::MissingCredentials {
                key_env: ENV_AZURE_ACCOUNT_KEY,
                token_env: ENV_AZURE_SAS_TOKEN,
            });
        }

        Ok(settings)
    }
}

fn require(key: &str) -> Result<String, HarvestError> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(HarvestError::InvalidConfig(format!(
            "missing required environment variable {key}"
        ))),
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
