//! Metadata application for synchronized files.
//!
//! After a file's data is in place (or was already correct), the receiver
//! peer fixes up modification time, permission bits and ownership to match
//! the authoritative entry. Failures here are reported by the caller and
//! never retried; they do not abort the transfer.
//!
//! The crate also owns the mknod wrapper used when recreating device nodes,
//! since that is the one other place the engine touches raw inode metadata.

use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use filetime::FileTime;
use flist::{FileEntry, FileMode};
use thiserror::Error;
use tracing::debug;

/// Which metadata axes the caller wants restored.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetadataOpts {
    /// Restore modification times.
    pub preserve_times: bool,
    /// Restore permission bits.
    pub preserve_perms: bool,
    /// Restore the owning user.
    pub preserve_uid: bool,
    /// Restore the owning group.
    pub preserve_gid: bool,
    /// Perform no mutations at all.
    pub dry_run: bool,
}

/// A metadata operation that failed.
///
/// These are report-only conditions: the file's data is already correct.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Could not stat the target to compare against.
    #[error("stat {path}: {source}")]
    Stat {
        /// Target path.
        path: String,
        /// Underlying error.
        source: io::Error,
    },
    /// Could not set the modification time.
    #[error("failed to set times on {path}: {source}")]
    SetTimes {
        /// Target path.
        path: String,
        /// Underlying error.
        source: io::Error,
    },
    /// Could not change the permission bits.
    #[error("failed to set permissions on {path}: {source}")]
    SetPerms {
        /// Target path.
        path: String,
        /// Underlying error.
        source: io::Error,
    },
    /// Could not change ownership.
    #[error("chown {path}: {source}")]
    Chown {
        /// Target path.
        path: String,
        /// Underlying error.
        source: io::Error,
    },
    /// Could not create a device node.
    #[error("mknod {path}: {source}")]
    Mknod {
        /// Target path.
        path: String,
        /// Underlying error.
        source: io::Error,
    },
}

/// Applies the preserved metadata axes of `entry` to `path`.
///
/// `current` is an already-available lstat result; when `None` the target is
/// stat'ed here. Returns whether anything was changed. With `report` set,
/// the outcome ("updated" vs "uptodate") is logged at debug verbosity.
///
/// Mutations stop at the first failure, matching the C reference: a chmod
/// error means ownership is not attempted either.
pub fn apply(
    path: &Path,
    entry: &FileEntry,
    current: Option<&fs::Metadata>,
    opts: MetadataOpts,
    report: bool,
) -> Result<bool, MetadataError> {
    if opts.dry_run {
        return Ok(false);
    }

    let fresh;
    let st = match current {
        Some(st) => st,
        None => {
            fresh = fs::symlink_metadata(path).map_err(|source| MetadataError::Stat {
                path: path.display().to_string(),
                source,
            })?;
            &fresh
        }
    };
    let is_symlink = FileMode::new(st.permissions().mode()).is_symlink();
    let mut updated = false;

    if opts.preserve_times && !is_symlink {
        let current_mtime = FileTime::from_last_modification_time(st);
        if current_mtime.unix_seconds() != entry.mtime {
            updated = true;
            filetime::set_file_mtime(path, FileTime::from_unix_time(entry.mtime, 0)).map_err(
                |source| MetadataError::SetTimes {
                    path: path.display().to_string(),
                    source,
                },
            )?;
        }
    }

    if opts.preserve_perms && !is_symlink {
        let current_mode = FileMode::new(st.permissions().mode());
        if current_mode.permissions() != entry.mode.permissions() {
            updated = true;
            fs::set_permissions(path, fs::Permissions::from_mode(entry.mode.permissions()))
                .map_err(|source| MetadataError::SetPerms {
                    path: path.display().to_string(),
                    source,
                })?;
        }
    }

    let want_uid = opts.preserve_uid && st.uid() != entry.uid;
    let want_gid = opts.preserve_gid && st.gid() != entry.gid;
    if want_uid || want_gid {
        updated = true;
        let uid = if opts.preserve_uid { entry.uid } else { u32::MAX };
        let gid = if opts.preserve_gid { entry.gid } else { u32::MAX };
        lchown(path, uid, gid).map_err(|source| MetadataError::Chown {
            path: path.display().to_string(),
            source,
        })?;
    }

    if report {
        if updated {
            debug!("{}", path.display());
        } else {
            debug!("{} is uptodate", path.display());
        }
    }

    Ok(updated)
}

/// Creates a device node with the given mode and device number.
pub fn create_device(path: &Path, mode: FileMode, rdev: u64) -> Result<(), MetadataError> {
    let c_path = c_path(path).map_err(|source| MetadataError::Mknod {
        path: path.display().to_string(),
        source,
    })?;
    let rc = unsafe { libc::mknod(c_path.as_ptr(), mode.raw() as libc::mode_t, rdev as libc::dev_t) };
    if rc == 0 {
        Ok(())
    } else {
        Err(MetadataError::Mknod {
            path: path.display().to_string(),
            source: io::Error::last_os_error(),
        })
    }
}

/// chown that does not follow symlinks; `u32::MAX` leaves an axis unchanged.
fn lchown(path: &Path, uid: u32, gid: u32) -> io::Result<()> {
    let c_path = c_path(path)?;
    let rc = unsafe { libc::lchown(c_path.as_ptr(), uid as libc::uid_t, gid as libc::gid_t) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

fn c_path(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write as _;
    use std::path::PathBuf;

    fn entry_for(path: &Path, dir: &Path) -> FileEntry {
        FileEntry::from_local(dir, Path::new(path.file_name().unwrap())).unwrap()
    }

    fn opts() -> MetadataOpts {
        MetadataOpts {
            preserve_times: true,
            preserve_perms: true,
            preserve_uid: false,
            preserve_gid: false,
            dry_run: false,
        }
    }

    #[test]
    fn matching_metadata_reports_uptodate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        File::create(&path).unwrap().write_all(b"x").unwrap();

        let entry = entry_for(&path, dir.path());
        let updated = apply(&path, &entry, None, opts(), true).unwrap();
        assert!(!updated);
    }

    #[test]
    fn differing_mtime_is_restored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        File::create(&path).unwrap();

        let mut entry = entry_for(&path, dir.path());
        entry.mtime -= 1000;

        let updated = apply(&path, &entry, None, opts(), false).unwrap();
        assert!(updated);

        let meta = fs::metadata(&path).unwrap();
        assert_eq!(
            FileTime::from_last_modification_time(&meta).unix_seconds(),
            entry.mtime
        );
    }

    #[test]
    fn differing_mode_is_restored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        File::create(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

        let mut entry = entry_for(&path, dir.path());
        entry.mode = FileMode::new(libc::S_IFREG as u32 | 0o644);

        assert!(apply(&path, &entry, None, opts(), false).unwrap());
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        File::create(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

        let mut entry = entry_for(&path, dir.path());
        entry.mode = FileMode::new(libc::S_IFREG as u32 | 0o644);
        entry.mtime -= 1000;

        let mut dry = opts();
        dry.dry_run = true;
        assert!(!apply(&path, &entry, None, dry, false).unwrap());
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn missing_target_surfaces_stat_error() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("gone");
        File::create(&path).unwrap();
        let entry = entry_for(&path, dir.path());
        fs::remove_file(&path).unwrap();

        let err = apply(&path, &entry, None, opts(), false).unwrap_err();
        assert!(matches!(err, MetadataError::Stat { .. }));
    }
}
