//! Strong checksum implementations backed by well-known hash algorithms.
//!
//! MD4 is the engine's block and whole-file strong checksum; MD5 is kept as
//! the drop-in alternative for callers that want a stronger digest at the
//! same interface. Both stream data incrementally behind [`StrongDigest`].

mod md4;
mod md5;

use std::io::{self, Read};

pub use md4::Md4;
pub use md5::Md5;

/// Trait implemented by strong checksum algorithms.
///
/// Callers feed data incrementally via [`Self::update`] and then obtain the
/// final digest through [`Self::finalize`]. [`DIGEST_LEN`](Self::DIGEST_LEN)
/// exposes the byte width of the result so higher layers can size buffers
/// without hard-coding algorithm knowledge.
pub trait StrongDigest: Sized {
    /// Type returned when finalising the digest.
    type Digest: AsRef<[u8]> + Copy;

    /// Length of the final digest in bytes.
    const DIGEST_LEN: usize;

    /// Creates a new hasher with an empty state.
    fn new() -> Self;

    /// Feeds additional bytes into the digest state.
    fn update(&mut self, data: &[u8]);

    /// Finalises the digest and returns the resulting hash.
    fn finalize(self) -> Self::Digest;

    /// Convenience helper that hashes `data` in a single call.
    fn digest(data: &[u8]) -> Self::Digest {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Hashes everything the reader yields, streaming in fixed-size chunks.
    ///
    /// Used for the whole-file digest consulted by the `always_checksum`
    /// identity test, where mapping the file is unnecessary.
    ///
    /// # Errors
    ///
    /// Propagates any [`io::Error`] from the reader.
    fn digest_reader<R: Read>(reader: &mut R) -> io::Result<Self::Digest> {
        let mut hasher = Self::new();
        let mut buffer = [0u8; 32 * 1024];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => hasher.update(&buffer[..n]),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(hasher.finalize())
    }
}
