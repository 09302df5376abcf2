use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::FileEntry;

/// A name-sorted list of file entries, addressed by stable index.
///
/// Both peers hold the same list; every index on the wire refers into it.
#[derive(Clone, Debug, Default)]
pub struct FileList {
    files: Vec<FileEntry>,
}

impl FileList {
    /// Builds a list from entries, sorting them by name.
    #[must_use]
    pub fn new(mut files: Vec<FileEntry>) -> Self {
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Self { files }
    }

    /// The entries in index order.
    #[must_use]
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Consumes the list, yielding its entries. Callers that enrich entries
    /// (whole-file checksums, remapped prefixes) rebuild with [`Self::new`].
    #[must_use]
    pub fn into_files(self) -> Vec<FileEntry> {
        self.files
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The entry at `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.files.get(index)
    }

    /// Finds an entry by transfer-relative name.
    #[must_use]
    pub fn find(&self, name: &Path) -> Option<usize> {
        self.files
            .binary_search_by(|entry| entry.name.as_path().cmp(name))
            .ok()
    }

    /// Enumerates a local tree into a list of transfer-relative entries.
    ///
    /// Used by deletion reconciliation and by embedders building an
    /// authoritative list. Unreadable entries are reported and skipped; the
    /// enumeration itself keeps going.
    #[must_use]
    pub fn from_local_tree(root: &Path, recurse: bool) -> Self {
        let mut files = Vec::new();
        collect(root, Path::new(""), recurse, &mut files);
        Self::new(files)
    }
}

fn collect(root: &Path, prefix: &Path, recurse: bool, files: &mut Vec<FileEntry>) {
    let dir = root.join(prefix);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("cannot read directory {}: {err}", dir.display());
            return;
        }
    };

    for dirent in entries {
        let dirent = match dirent {
            Ok(dirent) => dirent,
            Err(err) => {
                warn!("cannot read directory entry in {}: {err}", dir.display());
                continue;
            }
        };
        let name: PathBuf = prefix.join(dirent.file_name());
        match FileEntry::from_local(root, &name) {
            Ok(entry) => {
                let is_dir = entry.mode.is_dir();
                files.push(entry);
                if is_dir && recurse {
                    collect(root, &name, recurse, files);
                }
            }
            Err(err) => warn!("cannot stat {}: {err}", root.join(&name).display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn touch(path: &Path) {
        File::create(path).unwrap();
    }

    #[test]
    fn enumerates_and_sorts_a_tree() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.txt"));
        touch(&dir.path().join("a.txt"));
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub/c.txt"));

        let list = FileList::from_local_tree(dir.path(), true);
        let names: Vec<_> = list.files().iter().map(|f| f.name.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.txt"),
                PathBuf::from("b.txt"),
                PathBuf::from("sub"),
                PathBuf::from("sub/c.txt"),
            ]
        );
    }

    #[test]
    fn without_recursion_subtrees_are_shallow() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub/hidden.txt"));

        let list = FileList::from_local_tree(dir.path(), false);
        assert_eq!(list.len(), 1);
        assert_eq!(list.files()[0].name, PathBuf::from("sub"));
    }

    #[test]
    fn find_locates_entries_by_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("one"));
        touch(&dir.path().join("two"));

        let list = FileList::from_local_tree(dir.path(), true);
        let index = list.find(Path::new("two")).unwrap();
        assert_eq!(list.files()[index].name, PathBuf::from("two"));
        assert!(list.find(Path::new("missing")).is_none());
    }
}
