use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Alphabet for temp-file suffixes, mirroring `mktemp`'s `XXXXXX` scheme.
const SUFFIX_ALPHABET: &[u8; 62] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 6;
const CREATE_ATTEMPTS: u32 = 16;

/// The in-progress reconstruction target.
///
/// Created as `<target>.XXXXXX` in the target's own directory so the final
/// rename stays atomic. The value is a scoped cleanup guard: dropping it
/// without [`commit`](Self::commit) unlinks the temp path, which is what
/// reaps half-written output on fatal errors and interrupts.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    committed: bool,
}

impl TempFile {
    /// Creates the temp file next to `target` with the given mode bits.
    ///
    /// Collisions with an existing name are retried with a fresh suffix.
    pub fn create(target: &Path, mode: u32) -> io::Result<(File, Self)> {
        for _ in 0..CREATE_ATTEMPTS {
            let path = candidate_path(target)?;
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(mode)
                .open(&path)
            {
                Ok(file) => {
                    return Ok((
                        file,
                        Self {
                            path,
                            committed: false,
                        },
                    ));
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                Err(err) => return Err(err),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("cannot create unique temp file for {}", target.display()),
        ))
    }

    /// Path of the temp file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renames the temp file over `target` and disarms the guard.
    pub fn persist(mut self, target: &Path) -> io::Result<()> {
        fs::rename(&self.path, target)?;
        self.committed = true;
        Ok(())
    }

    /// Disarms the guard without renaming (the caller moved the file).
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn candidate_path(target: &Path) -> io::Result<PathBuf> {
    let mut raw = [0u8; SUFFIX_LEN];
    getrandom::fill(&mut raw)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;

    let mut name = target.as_os_str().to_os_string();
    name.push(".");
    for byte in raw {
        let ch = SUFFIX_ALPHABET[usize::from(byte) % SUFFIX_ALPHABET.len()] as char;
        name.push(ch.to_string());
    }
    Ok(PathBuf::from(name))
}
