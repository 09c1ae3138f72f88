// src/constants.rs
//
// Centralized constants for blobharvest to avoid hardcoded values throughout the codebase

use std::time::Duration;

/// Buffer size for streaming downloads (1 MB)
/// Keeps memory use independent of object size; matches the remote read chunking.
pub const DEFAULT_STREAM_BUFFER_SIZE: usize = 1024 * 1024;

/// Default lifetime of a read grant (1 hour)
pub const DEFAULT_GRANT_TTL: Duration = Duration::from_secs(3600);

/// Storage service version stamped into signed grants
pub const SAS_VERSION: &str = "2021-08-06";

/// Default local root the pipeline lands artifacts under
pub const DEFAULT_LOCAL_ROOT: &str = "downloads";

/// Subdirectory of the local root that receives extracted images and metadata
pub const IMAGES_SUBDIR: &str = "images";

/// Column expected to hold the per-row payload mapping in columnar inputs
pub const DEFAULT_IMAGE_COLUMN: &str = "image";

/// Column supplying the per-row title metadata field
pub const DEFAULT_TITLE_COLUMN: &str = "title";

/// Title recorded when a row carries no usable title value
pub const TITLE_SENTINEL: &str = "Untitled";

/// File extension written for extracted binary payloads
pub const IMAGE_EXTENSION: &str = "png";

/// Base names that get an archive-derived prefix after unpacking
pub const RENAME_STEMS: [&str; 2] = ["train", "test"];

// =============================================================================
// Environment variable names
// =============================================================================

/// Storage account name
pub const ENV_AZURE_ACCOUNT: &str = "AZURE_STORAGE_ACCOUNT";

/// Base64 account signing key; optional when a pre-built token is supplied
pub const ENV_AZURE_ACCOUNT_KEY: &str = "AZURE_STORAGE_KEY";

/// Container holding the source objects
pub const ENV_AZURE_CONTAINER: &str = "AZURE_STORAGE_CONTAINER";

/// Path prefix scoping the listing to a subdirectory
pub const ENV_AZURE_PREFIX: &str = "AZURE_STORAGE_PREFIX";

/// Externally supplied, pre-built access token (query-string form, no leading '?')
pub const ENV_AZURE_SAS_TOKEN: &str = "AZURE_SAS_TOKEN";

/// Custom Azure Blob Storage endpoint, e.g. an Azurite emulator
/// Example: AZURE_STORAGE_ENDPOINT=http://127.0.0.1:10000/devstoreaccount1
pub const ENV_AZURE_STORAGE_ENDPOINT: &str = "AZURE_STORAGE_ENDPOINT";

/// Local root directory override (defaults to `downloads`)
pub const ENV_LOCAL_ROOT: &str = "HARVEST_LOCAL_ROOT";

/// Designated structured-column name override (defaults to `image`)
pub const ENV_IMAGE_COLUMN: &str = "HARVEST_IMAGE_COLUMN";
