// src/error.rs
//
// Failure taxonomy for the harvest pipeline.
//
// Only `ListingFailed` (and the credential errors raised before the run
// starts) abort a run. Everything else is scoped to one object, one file, or
// one archive: the pipeline logs it, records it in the run report, and moves
// on. Nothing is retried.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Enumerating the remote container failed. Fatal: without a listing
    /// there is nothing to process.
    #[error("listing failed for prefix '{prefix}': {reason}")]
    ListingFailed { prefix: String, reason: String },

    /// The store rejected a read grant (expired, or scope too narrow).
    /// Per-object; the grant is not renewed and the object is skipped.
    #[error("read grant rejected for '{object}' (status {status})")]
    AuthorizationExpired { object: String, status: u16 },

    /// Transfer of one object failed. Per-object.
    #[error("download failed for '{object}': {reason}")]
    DownloadFailed { object: String, reason: String },

    /// A downloaded columnar file could not be opened or decoded. Per-file;
    /// rows with unexpected shapes are skipped individually and never reach
    /// this variant.
    #[error("decode failed for '{}': {reason}", .file.display())]
    DecodeFailed { file: PathBuf, reason: String },

    /// A downloaded archive could not be unpacked. Per-archive.
    #[error("unpack failed for '{}': {reason}", .archive.display())]
    UnpackFailed { archive: PathBuf, reason: String },

    /// Neither a signing key nor a pre-built token was supplied. Fatal at
    /// startup: no object can be accessed.
    #[error("no credentials: set {key_env} or supply {token_env}")]
    MissingCredentials {
        key_env: &'static str,
        token_env: &'static str,
    },

    /// The signing key was present but not valid base64. Fatal at startup.
    #[error("malformed signing key: {0}")]
    MalformedSigningKey(String),

    /// A required configuration value is absent or unusable. Fatal at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl HarvestError {
    /// True for errors that abort the whole run rather than one object.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarvestError::ListingFailed { .. }
                | HarvestError::MissingCredentials { .. }
                | HarvestError::MalformedSigningKey(_)
                | HarvestError::InvalidConfig(_)
        )
    }
}
