// src/pipeline.rs
//
// Single-pass batch orchestration: list the prefix, walk the objects one at
// a time (download, extract or unpack, consume), and finish with one pruning
// pass over the local root. Failures below the listing are isolated per
// object: logged, recorded in the report, never retried, never fatal.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::archive;
use crate::azure_client::{AzureBlob, ObjectKind, RemoteObject};
use crate::config::Settings;
use crate::constants::IMAGES_SUBDIR;
use crate::download::download_object;
use crate::error::HarvestError;
use crate::janitor;
use crate::parquet_extract;

/// What one run did. Produced even when every object failed individually;
/// only a failed listing (or unusable credentials) prevents a report.
#[derive(Debug, Default)]
pub struct RunReport {
    pub listed: usize,
    pub downloaded: usize,
    pub images_extracted: usize,
    pub archives_unpacked: usize,
    pub kept: usize,
    pub skipped_unsupported: usize,
    pub pruned_dirs: usize,
    pub failures: Vec<ObjectFailure>,
}

#[derive(Debug)]
pub struct ObjectFailure {
    pub object: String,
    pub error: HarvestError,
}

impl RunReport {
    /// Exit-status policy: the run "succeeded" if it could start at all;
    /// per-object failures are reported but do not fail the process.
    pub fn ok(&self) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct Pipeline<'a> {
    settings: &'a Settings,
    client: AzureBlob,
}

impl<'a> Pipeline<'a> {
    /// Fails only on unusable credentials or endpoint configuration.
    pub fn new(settings: &'a Settings) -> Result<Self, HarvestError> {
        let client = AzureBlob::from_settings(settings)?;
        Ok(Pipeline { settings, client })
    }

    pub fn client(&self) -> &AzureBlob {
        &self.client
    }

    /// List, process each object independently, then prune. Returns an error
    /// only when the listing itself fails.
    pub async fn run(&self) -> Result<RunReport, HarvestError> {
        let objects = self.client.list(&self.settings.prefix).await?;
        info!(
            "listed {} objects under '{}' in container '{}'",
            objects.len(),
            self.settings.prefix,
            self.settings.container,
        );

        let mut report = RunReport { listed: objects.len(), ..RunReport::default() };
        for object in &objects {
            match self.process(object, &mut report).await {
                Ok(()) => {}
                Err(error) => {
                    warn!("{error}");
                    report.failures.push(ObjectFailure { object: object.path.clone(), error });
                }
            }
        }

        // Prune only after every object is done: consumption is what leaves
        // the mirrored directories empty.
        match janitor::prune_empty(&self.settings.local_root) {
            Ok(n) => report.pruned_dirs = n,
            Err(e) => warn!("pruning {}: {e}", self.settings.local_root.display()),
        }

        info!(
            "run complete: {} downloaded, {} images, {} archives, {} kept, {} failures",
            report.downloaded,
            report.images_extracted,
            report.archives_unpacked,
            report.kept,
            report.failures.len(),
        );
        Ok(report)
    }

    async fn process(&self, object: &RemoteObject, report: &mut RunReport) -> Result<(), HarvestError> {
        if object.kind == ObjectKind::Unsupported {
            debug!("skipping unsupported object '{}'", object.path);
            report.skipped_unsupported += 1;
            return Ok(());
        }

        info!("processing '{}'", object.path);
        let local = download_object(&self.client, &object.path, &self.settings.local_root).await?;
        report.downloaded += 1;

        match object.kind {
            ObjectKind::Parquet => {
                let extraction = parquet_extract::extract(
                    &local,
                    &self.images_dir(),
                    &self.settings.image_column,
                    &self.settings.title_column,
                )?;
                info!(
                    "extracted {} images from '{}' ({} rows skipped)",
                    extraction.images.len(),
                    object.path,
                    extraction.skipped_rows,
                );
                report.images_extracted += extraction.images.len();
                consume(&local);
            }
            ObjectKind::Zip | ObjectKind::TarGz => {
                let dest = local
                    .parent()
                    .map(|p| p.join(archive::archive_stem(&local)))
                    .unwrap_or_else(|| PathBuf::from(archive::archive_stem(&local)));
                let outcome = archive::unpack_tree(&local, &dest)?;
                info!(
                    "unpacked '{}' into {} ({} nested, {} renamed)",
                    object.path,
                    outcome.destination.display(),
                    outcome.nested.len(),
                    outcome.renamed.len(),
                );
                report.archives_unpacked += 1;
                consume(&local);
            }
            ObjectKind::Csv | ObjectKind::Spreadsheet => {
                // Outputs in their own right: mirrored and kept.
                report.kept += 1;
            }
            ObjectKind::Unsupported => unreachable!("filtered above"),
        }
        Ok(())
    }

    fn images_dir(&self) -> PathBuf {
        self.settings.local_root.join(IMAGES_SUBDIR)
    }
}

/// A container that cannot be deleted is a stray file, not a failed object;
/// the processing already succeeded.
fn consume(local: &std::path::Path) {
    if let Err(e) = janitor::consume(local) {
        warn!("could not remove consumed file {}: {e}", local.display());
    }
}
