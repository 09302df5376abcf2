use std::fs::File;
use std::io;
use std::path::Path;

use memmap2::Mmap;

/// Read-only byte view over a file.
///
/// Zero-length files carry no mapping at all (mapping zero bytes is an error
/// on most platforms); they present as an empty slice. The view stays valid
/// for as long as the value lives, which on the receiver spans one file's
/// whole reconstruction so block references keep resolving.
#[derive(Debug)]
pub struct FileMap {
    map: Option<Mmap>,
}

impl FileMap {
    /// Maps an already-open file.
    pub fn new(file: &File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(Self { map: None });
        }
        // Safety: the mapping is read-only and private; concurrent writers
        // to the underlying file would at worst change the bytes we read,
        // which the delta protocol already treats as "stale copy" content.
        let map = unsafe { Mmap::map(file)? };
        Ok(Self { map: Some(map) })
    }

    /// Opens and maps the file at `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        Self::new(&File::open(path)?)
    }

    /// The full mapped contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }

    /// Total length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    /// Whether the underlying file was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    /// A bounded sub-range of the view, if it lies fully inside the file.
    #[must_use]
    pub fn range(&self, offset: u64, len: usize) -> Option<&[u8]> {
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(len)?;
        self.bytes().get(start..end)
    }
}
