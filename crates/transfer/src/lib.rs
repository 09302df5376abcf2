//! File-level plumbing for the receiver and sender peers.
//!
//! - [`FileMap`]: a read-only byte view over a file, backing both the
//!   sender's scan of the authoritative copy and the receiver's block-ref
//!   resolution against its stale copy.
//! - [`SparseWriteState`]: turns runs of zero bytes into seeks so the
//!   reconstructed file comes out sparse where the content allows.
//! - [`TempFile`]: the reconstruction target, created next to the final path
//!   and unlinked on drop unless committed. This is the cleanup guard that
//!   replaces the C reference's module-level `cleanup_fname` pointer.
//! - [`make_backup`]: displaces an existing target to `<target><suffix>`.

mod map;
mod sparse;
mod tempfile_guard;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub use map::FileMap;
pub use sparse::SparseWriteState;
pub use tempfile_guard::TempFile;

/// Backup path for a target: `<target><suffix>` in the same directory.
#[must_use]
pub fn backup_path(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Renames `target` to its backup path. A missing target is not an error;
/// any other failure is.
pub fn make_backup(target: &Path, suffix: &str) -> io::Result<()> {
    match fs::rename(target, backup_path(target, suffix)) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
