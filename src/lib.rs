// src/lib.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
// Crate root — public re-exports.

pub mod archive;
pub mod azure_client;
pub mod config;
pub mod constants;
pub mod download;
pub mod error;
pub mod janitor;
pub mod parquet_extract;
pub mod pipeline;
pub mod sas;

pub use archive::{archive_stem, unpack, unpack_tree, ArchiveFormat, UnpackOutcome};
pub use azure_client::{AzureBlob, ObjectKind, RemoteObject};
pub use config::Settings;
pub use download::{download_object, local_path_for};
pub use error::HarvestError;
pub use janitor::{consume, prune_empty};
pub use parquet_extract::{extract, ExtractedImage, Extraction, MetadataRecord};
pub use pipeline::{ObjectFailure, Pipeline, RunReport};
pub use sas::{AccessGrant, Permissions, SasProvider, Scope};
