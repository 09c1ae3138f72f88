// src/archive.rs
//
// Archive unpacker: flat extraction for zip and tar+gzip containers, one
// fixed extra level of nesting, then renaming of the generically named
// train/test outputs with an identifier derived from the top-level archive.

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::constants::RENAME_STEMS;
use crate::error::HarvestError;
use crate::janitor;

/// Container formats the unpacker understands, selected by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    pub fn from_path(path: &Path) -> Option<ArchiveFormat> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if name.ends_with(".tgz") || name.ends_with(".tar.gz") {
            Some(ArchiveFormat::TarGz)
        } else {
            None
        }
    }
}

/// Archive file name minus its container extension; `data.tar.gz` -> `data`.
pub fn archive_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    for suffix in [".tar.gz", ".tgz", ".zip"] {
        if name.to_ascii_lowercase().ends_with(suffix) {
            return name[..name.len() - suffix.len()].to_string();
        }
    }
    name
}

/// What a full `unpack_tree` pass produced.
#[derive(Debug)]
pub struct UnpackOutcome {
    /// Directory the final outputs live under.
    pub destination: PathBuf,
    /// Nested archives that were unpacked and then consumed.
    pub nested: Vec<PathBuf>,
    /// Files renamed with the archive-derived prefix, (from, to).
    pub renamed: Vec<(PathBuf, PathBuf)>,
}

/// Single flat extraction of one archive into `destination`, no entry-level
/// filtering. The destination is created if missing.
pub fn unpack(archive: &Path, destination: &Path) -> Result<(), HarvestError> {
    let fail = |reason: String| HarvestError::UnpackFailed {
        archive: archive.to_path_buf(),
        reason,
    };
    let format = ArchiveFormat::from_path(archive)
        .ok_or_else(|| fail("not a recognized container format".to_string()))?;

    std::fs::create_dir_all(destination)
        .map_err(|e| fail(format!("mkdir {}: {e}", destination.display())))?;

    let file = File::open(archive).map_err(|e| fail(e.to_string()))?;
    match format {
        ArchiveFormat::Zip => {
            let mut zip = zip::ZipArchive::new(file).map_err(|e| fail(e.to_string()))?;
            zip.extract(destination).map_err(|e| fail(e.to_string()))?;
        }
        ArchiveFormat::TarGz => {
            let gz = GzDecoder::new(file);
            let mut tar = tar::Archive::new(gz);
            tar.unpack(destination).map_err(|e| fail(e.to_string()))?;
        }
    }
    debug!("unpacked {} -> {}", archive.display(), destination.display());
    Ok(())
}

/// Unpack `archive` into `destination`, recurse into one nested archive if
/// the extraction produced any (fixed two-level depth), consume the nested
/// container files, and prefix generic `train`/`test` outputs with the
/// top-level archive's stem.
pub fn unpack_tree(archive: &Path, destination: &Path) -> Result<UnpackOutcome, HarvestError> {
    let fail = |reason: String| HarvestError::UnpackFailed {
        archive: archive.to_path_buf(),
        reason,
    };
    let prefix = archive_stem(archive);

    unpack(archive, destination)?;

    let mut outcome = UnpackOutcome {
        destination: destination.to_path_buf(),
        nested: Vec::new(),
        renamed: Vec::new(),
    };

    // One extra level only: nested archives below the first level stay put.
    for entry in list_dir(destination).map_err(&fail)? {
        if ArchiveFormat::from_path(&entry).is_none() {
            continue;
        }
        let inner_dest = destination.join(archive_stem(&entry));
        unpack(&entry, &inner_dest)?;
        outcome.renamed.extend(rename_outputs(&inner_dest, &prefix).map_err(&fail)?);
        janitor::consume(&entry).map_err(|e| fail(format!("removing {}: {e}", entry.display())))?;
        info!("nested archive {} unpacked and consumed", entry.display());
        outcome.nested.push(entry);
    }

    // Flat archives carry their outputs directly in the destination.
    if outcome.nested.is_empty() {
        outcome.renamed = rename_outputs(destination, &prefix).map_err(&fail)?;
    }

    Ok(outcome)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| e.to_string())? {
        entries.push(entry.map_err(|e| e.to_string())?.path());
    }
    entries.sort();
    Ok(entries)
}

/// Prefix files whose stem is exactly `train` or `test` with `{prefix}_`,
/// keeping their extension. Disambiguates outputs from multiple archives
/// sharing generic filenames.
fn rename_outputs(dir: &Path, prefix: &str) -> Result<Vec<(PathBuf, PathBuf)>, String> {
    let mut renamed = Vec::new();
    for entry in list_dir(dir)? {
        if !entry.is_file() {
            continue;
        }
        let stem_matches = entry
            .file_stem()
            .map(|s| s.to_string_lossy())
            .map(|s| RENAME_STEMS.iter().any(|k| s == *k))
            .unwrap_or(false);
        if !stem_matches {
            continue;
        }
        let Some(name) = entry.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let target = dir.join(format!("{prefix}_{name}"));
        std::fs::rename(&entry, &target).map_err(|e| e.to_string())?;
        renamed.push((entry, target));
    }
    Ok(renamed)
}
