// src/janitor.rs
//
// Workspace janitor: deletes container files once their contents have been
// extracted, and prunes the directories that consumption leaves empty. Only
// consumed containers are ever deleted; extracted outputs are not touched.

use std::io;
use std::path::Path;

use tracing::debug;

/// Delete a fully processed container file. Already-gone files are fine.
pub fn consume(artifact: &Path) -> io::Result<()> {
    match std::fs::remove_file(artifact) {
        Ok(()) => {
            debug!("consumed {}", artifact.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Remove every directory under `root` (including `root` itself) that is
/// empty, walking post-order so a directory whose children were all pruned
/// is itself pruned. Returns the number of directories removed. Safe to run
/// on an already-clean tree; a missing root is a no-op.
pub fn prune_empty(root: &Path) -> io::Result<usize> {
    if !root.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    prune_dir(root, &mut removed)?;
    Ok(removed)
}

/// Post-order: children first, then the directory itself if nothing is left.
fn prune_dir(dir: &Path, removed: &mut usize) -> io::Result<bool> {
    let mut empty = true;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if !prune_dir(&path, removed)? {
                empty = false;
            }
        } else {
            empty = false;
        }
    }
    if empty {
        std::fs::remove_dir(dir)?;
        debug!("pruned empty directory {}", dir.display());
        *removed += 1;
    }
    Ok(empty)
}
