use rustc_hash::FxHashMap;

use crate::{FileEntry, FileList, InodeId};

/// Maps each hard-linked inode to the first list entry that references it.
///
/// Only the first reference transfers data; later aliases are deferred to
/// the hard-link handler and carry nothing on the wire.
#[derive(Clone, Debug, Default)]
pub struct HardLinkMap {
    first: FxHashMap<InodeId, usize>,
}

impl HardLinkMap {
    /// Scans a list for regular files with inode identity.
    #[must_use]
    pub fn build(list: &FileList) -> Self {
        let mut first = FxHashMap::default();
        for (index, entry) in list.files().iter().enumerate() {
            if !entry.mode.is_regular() {
                continue;
            }
            if let Some(ids) = entry.ids {
                first.entry(ids).or_insert(index);
            }
        }
        Self { first }
    }

    /// Whether `entry` at `index` is a later alias of an inode already seen.
    #[must_use]
    pub fn is_secondary(&self, index: usize, entry: &FileEntry) -> bool {
        entry
            .ids
            .and_then(|ids| self.first.get(&ids))
            .is_some_and(|&primary| primary != index)
    }
}
