use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use crate::FileMode;

/// Filesystem identity of an inode, used to spot hard-link aliases.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct InodeId {
    /// Device the inode lives on.
    pub dev: u64,
    /// Inode number.
    pub ino: u64,
}

/// One logical file in the transfer list.
///
/// `name` is the path relative to the transfer root on both peers; `dir` is
/// the sender-side prefix the authoritative copy lives under. The remaining
/// fields mirror what `lstat` reports plus the optional whole-file strong
/// checksum an authoritative list may carry.
#[derive(Clone, Debug)]
pub struct FileEntry {
    /// Transfer-relative path.
    pub name: PathBuf,
    /// Sender-side directory prefix, if any.
    pub dir: Option<PathBuf>,
    /// Type and permission bits.
    pub mode: FileMode,
    /// File length in bytes.
    pub len: u64,
    /// Modification time, seconds since the epoch.
    pub mtime: i64,
    /// Owner.
    pub uid: u32,
    /// Group.
    pub gid: u32,
    /// Device number, meaningful only for device nodes.
    pub rdev: u64,
    /// Symlink target, when the entry is a symlink.
    pub link_target: Option<PathBuf>,
    /// Whole-file strong checksum, when the list was built with checksums.
    pub checksum: Option<[u8; 16]>,
    /// dev/ino identity for hard-link detection, when locally enumerated.
    pub ids: Option<InodeId>,
}

impl FileEntry {
    /// Builds an entry by `lstat`ing `root/name`.
    ///
    /// Symlink targets are captured; nothing is followed.
    pub fn from_local(root: &Path, name: &Path) -> io::Result<Self> {
        let full = root.join(name);
        let meta = fs::symlink_metadata(&full)?;
        let mode = FileMode::new(meta.mode());

        let link_target = if mode.is_symlink() {
            Some(fs::read_link(&full)?)
        } else {
            None
        };

        Ok(Self {
            name: name.to_path_buf(),
            dir: Some(root.to_path_buf()),
            mode,
            len: meta.len(),
            mtime: meta.mtime(),
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: meta.rdev(),
            link_target,
            checksum: None,
            ids: Some(InodeId {
                dev: meta.dev(),
                ino: meta.ino(),
            }),
        })
    }

    /// Path of the authoritative copy on the sender: `dir/name`.
    #[must_use]
    pub fn source_path(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => dir.join(&self.name),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write as _;

    #[test]
    fn from_local_captures_stat_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join("data.bin")).unwrap();
        file.write_all(b"0123456789").unwrap();
        drop(file);

        let entry = FileEntry::from_local(dir.path(), Path::new("data.bin")).unwrap();
        assert!(entry.mode.is_regular());
        assert_eq!(entry.len, 10);
        assert!(entry.ids.is_some());
        assert!(entry.link_target.is_none());
        assert_eq!(entry.source_path(), dir.path().join("data.bin"));
    }

    #[cfg(unix)]
    #[test]
    fn from_local_captures_symlink_target() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("over/there", dir.path().join("link")).unwrap();

        let entry = FileEntry::from_local(dir.path(), Path::new("link")).unwrap();
        assert!(entry.mode.is_symlink());
        assert_eq!(entry.link_target.as_deref(), Some(Path::new("over/there")));
    }

    #[test]
    fn source_path_without_dir_is_bare_name() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("f")).unwrap();
        let mut entry = FileEntry::from_local(dir.path(), Path::new("f")).unwrap();
        entry.dir = None;
        assert_eq!(entry.source_path(), PathBuf::from("f"));
    }
}
