//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! CLI supporting `run`, `ls`, `get`, `extract`, `unpack`, and `prune`.
//!
//! Examples:
//! ```bash
//! harvest-cli run                                  # full pipeline over the configured prefix
//! harvest-cli ls                                   # list remote objects under the prefix
//! harvest-cli ls -p '.*\.parquet$'                 # with client-side regex filter
//! harvest-cli get raw/2024/part-0.parquet          # download one object, no processing
//! harvest-cli extract downloads/part-0.parquet     # extract a local columnar file
//! harvest-cli unpack downloads/ml/batch.zip out/   # unpack a local archive
//! harvest-cli prune                                # remove empty directories under the root
//! ```

use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use blobharvest::constants::{
    DEFAULT_IMAGE_COLUMN, DEFAULT_LOCAL_ROOT, DEFAULT_TITLE_COLUMN, ENV_IMAGE_COLUMN,
    ENV_LOCAL_ROOT, IMAGES_SUBDIR,
};
use blobharvest::{archive, janitor, parquet_extract, Pipeline, RunReport, Settings};

/// Macro to safely print with broken pipe handling
macro_rules! safe_println {
    ($($arg:tt)*) => {
        match writeln!(io::stdout(), $($arg)*) {
            Ok(_) => {},
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                // Gracefully exit on broken pipe (e.g., when piped to head/tail)
                std::process::exit(0);
            }
            Err(e) => return Err(e.into())
        }
    };
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short = 'v',
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity: -v = Info, -vv = Debug",
    )]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: list, download, extract/unpack, clean up.
    Run,

    /// List remote objects under the configured prefix.
    Ls {
        /// Optional regex pattern to filter names (applied client-side).
        #[clap(short, long)]
        pattern: Option<String>,
    },

    /// Download a single object to the mirrored local path, no processing.
    Get {
        /// Object path relative to the container (e.g. raw/part-0.parquet).
        object: String,
    },

    /// Extract images and metadata from an already-downloaded columnar file.
    Extract {
        /// Local Parquet file.
        file: PathBuf,

        /// Output directory (defaults to `<local root>/images`).
        #[clap(short, long)]
        out: Option<PathBuf>,
    },

    /// Unpack an already-downloaded archive (zip or tar+gzip).
    Unpack {
        /// Local archive file.
        archive: PathBuf,

        /// Destination directory (defaults to a sibling named after the stem).
        destination: Option<PathBuf>,
    },

    /// Remove directories left empty under the local root.
    Prune,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    match cli.cmd {
        Command::Run => {
            let settings = Settings::from_env()?;
            let pipeline = Pipeline::new(&settings)?;
            let report = pipeline.run().await?;
            print_report(&report)?;
        }

        Command::Ls { pattern } => {
            let settings = Settings::from_env()?;
            let pipeline = Pipeline::new(&settings)?;
            let mut objects = pipeline.client().list(&settings.prefix).await?;

            if let Some(pat) = pattern {
                let re = regex::Regex::new(&pat)
                    .with_context(|| format!("Invalid regex pattern: '{}'", pat))?;
                objects.retain(|o| re.is_match(&o.path));
            }

            for object in &objects {
                safe_println!("{}", object.path);
            }
            safe_println!("\nTotal objects: {}", objects.len());
        }

        Command::Get { object } => {
            let settings = Settings::from_env()?;
            let pipeline = Pipeline::new(&settings)?;
            let dest =
                blobharvest::download_object(pipeline.client(), &object, &settings.local_root)
                    .await?;
            safe_println!("Downloaded {} -> {}", object, dest.display());
        }

        // Local-only: no credentials needed for an already-downloaded file.
        Command::Extract { file, out } => {
            let out = out.unwrap_or_else(|| local_root().join(IMAGES_SUBDIR));
            let image_column = std::env::var(ENV_IMAGE_COLUMN)
                .unwrap_or_else(|_| DEFAULT_IMAGE_COLUMN.to_string());
            let extraction =
                parquet_extract::extract(&file, &out, &image_column, DEFAULT_TITLE_COLUMN)?;
            safe_println!(
                "Extracted {} images ({} rows skipped)",
                extraction.images.len(),
                extraction.skipped_rows,
            );
            if let Some(csv) = &extraction.metadata_path {
                safe_println!("Metadata: {}", csv.display());
            }
        }

        Command::Unpack { archive: archive_path, destination } => {
            let dest = destination.unwrap_or_else(|| {
                let stem = archive::archive_stem(&archive_path);
                archive_path.parent().map(|p| p.join(&stem)).unwrap_or_else(|| stem.into())
            });
            let outcome = archive::unpack_tree(&archive_path, &dest)?;
            safe_println!("Unpacked into {}", outcome.destination.display());
            for (from, to) in &outcome.renamed {
                safe_println!("Renamed {} -> {}", from.display(), to.display());
            }
        }

        Command::Prune => {
            let removed = janitor::prune_empty(&local_root())?;
            safe_println!("Removed {} empty directories", removed);
        }
    }

    Ok(())
}

fn local_root() -> PathBuf {
    std::env::var(ENV_LOCAL_ROOT)
        .unwrap_or_else(|_| DEFAULT_LOCAL_ROOT.to_string())
        .into()
}

/// Per-object failures are reported but never change the exit status; the
/// run as a whole failed only if it could not start (listing/credentials),
/// and those paths return an error before reaching here.
fn print_report(report: &RunReport) -> Result<()> {
    safe_println!("Objects listed     : {}", report.listed);
    safe_println!("Downloaded         : {}", report.downloaded);
    safe_println!("Images extracted   : {}", report.images_extracted);
    safe_println!("Archives unpacked  : {}", report.archives_unpacked);
    safe_println!("Kept as-is         : {}", report.kept);
    safe_println!("Unsupported skipped: {}", report.skipped_unsupported);
    safe_println!("Empty dirs pruned  : {}", report.pruned_dirs);
    if !report.failures.is_empty() {
        warn!("{} objects failed:", report.failures.len());
        for failure in &report.failures {
            warn!("  {}: {}", failure.object, failure.error);
        }
    }
    Ok(())
}
