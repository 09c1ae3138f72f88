// src/download.rs
//
// Stream downloader: lands one remote object under a local root, recreating
// the remote directory hierarchy, with memory use independent of object size.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::azure_client::AzureBlob;
use crate::constants::DEFAULT_STREAM_BUFFER_SIZE;
use crate::error::HarvestError;

/// Local destination mirroring a slash-separated remote path beneath `root`.
/// Empty and dot segments are dropped so a listing entry can never escape
/// the root.
pub fn local_path_for(remote_path: &str, root: &Path) -> PathBuf {
    let mut dest = root.to_path_buf();
    for seg in remote_path.split('/') {
        if seg.is_empty() || seg == "." || seg == ".." {
            continue;
        }
        dest.push(seg);
    }
    dest
}

/// Stream one object to `local_path_for(remote_path, root)`, creating
/// intermediate directories idempotently and overwriting any previous copy.
pub async fn download_object(
    client: &AzureBlob,
    remote_path: &str,
    root: &Path,
) -> Result<PathBuf, HarvestError> {
    let dest = local_path_for(remote_path, root);
    let fail = |reason: String| HarvestError::DownloadFailed {
        object: remote_path.to_string(),
        reason,
    };

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| fail(format!("mkdir {}: {e}", parent.display())))?;
    }

    let resp = client.get_stream(remote_path).await?;

    let file = tokio::fs::File::create(&dest)
        .await
        .map_err(|e| fail(format!("create {}: {e}", dest.display())))?;
    let mut writer = BufWriter::with_capacity(DEFAULT_STREAM_BUFFER_SIZE, file);

    let mut stream = resp.bytes_stream();
    let mut total: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| fail(e.to_string()))?;
        total += chunk.len() as u64;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| fail(format!("write {}: {e}", dest.display())))?;
    }
    writer
        .flush()
        .await
        .map_err(|e| fail(format!("flush {}: {e}", dest.display())))?;

    debug!("downloaded {} ({} bytes) -> {}", remote_path, total, dest.display());
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_preserves_hierarchy() {
        let root = Path::new("downloads");
        assert_eq!(
            local_path_for("raw/2024/part-0.parquet", root),
            root.join("raw").join("2024").join("part-0.parquet"),
        );
        assert_eq!(local_path_for("flat.csv", root), root.join("flat.csv"));
    }

    #[test]
    fn mirror_drops_dot_and_empty_segments() {
        let root = Path::new("downloads");
        assert_eq!(
            local_path_for("a//b/../c.zip", root),
            root.join("a").join("b").join("c.zip"),
        );
    }
}
