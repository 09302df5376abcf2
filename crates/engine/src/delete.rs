//! Deletion reconciliation: removing receiver-side files absent from the
//! authoritative list.

use std::path::Path;

use flist::{FileEntry, FileList};
use tracing::{debug, info, warn};

use crate::SyncConfig;

/// Removes every local entry not present in the authoritative list.
///
/// The local tree is enumerated into a name-sorted list and walked in
/// reverse, so directory contents are removed before the directory itself.
/// `ENOTEMPTY` from `rmdir` is still tolerated silently (a directory kept
/// alive by non-extraneous content simply stays, to be retried on a later
/// run); other failures are reported. Exclude-pattern filtering of the
/// enumeration belongs to the external filter collaborator.
pub(crate) fn delete_files(cfg: &SyncConfig, list: &FileList, dest_root: &Path) {
    debug!("deleting files not on the sender");

    let local = FileList::from_local_tree(dest_root, cfg.recurse);
    for entry in local.files().iter().rev() {
        if list.find(&entry.name).is_none() {
            delete_one(cfg, dest_root, entry);
        }
    }
}

fn delete_one(cfg: &SyncConfig, dest_root: &Path, entry: &FileEntry) {
    let path = dest_root.join(&entry.name);

    if entry.mode.is_dir() {
        if !cfg.dry_run {
            if let Err(err) = std::fs::remove_dir(&path) {
                if err.raw_os_error() != Some(libc::ENOTEMPTY) {
                    warn!("rmdir {}: {err}", path.display());
                }
                return;
            }
        }
        info!("deleting directory {}", path.display());
    } else {
        if !cfg.dry_run {
            if let Err(err) = std::fs::remove_file(&path) {
                warn!("unlink {}: {err}", path.display());
                return;
            }
        }
        info!("deleting {}", path.display());
    }
}
