#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `signature` models one file's decomposition into checksummed blocks: the
//! per-block record ([`SignatureBlock`]), the table describing a whole file
//! ([`FileSignature`]), generation from a byte view, and the wire packet
//! codec exchanged between the generator and the sender.
//!
//! # Layout invariants
//!
//! For a table with block length `n`, `count` blocks and tail `remainder`:
//!
//! - `blocks[i].offset == i * n`
//! - `blocks[i].len == n` for every block except the last, whose length is
//!   `remainder` when `remainder != 0`
//! - `file_len == (count − 1) * n + remainder` when `remainder != 0`, else
//!   `count * n`
//!
//! A zero-length file yields an empty table (`count == 0`), which is the
//! legal way for a receiver to ask for the whole file as literals.

use std::io::{self, Read, Write};
use std::num::NonZeroU32;

use checksums::strong::{Md4, Md5, StrongDigest};
use checksums::RollingDigest;
use protocol::wire::{read_buf, read_int, write_buf, write_int};
use protocol::{ChecksumLength, SUM_LENGTH, WireError};

/// Strong-checksum algorithm used for block and whole-file digests.
///
/// MD4 is the default and matches the C reference's behavior; MD5 is the
/// drop-in upgrade for closed deployments where both peers run this
/// implementation. Both emit [`SUM_LENGTH`]-byte digests, so the choice never
/// changes the wire shape — it is negotiated out-of-band like the checksum
/// truncation, and both peers must agree.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum SignatureAlgorithm {
    /// MD4, the reference default.
    #[default]
    Md4,
    /// MD5.
    Md5,
}

impl SignatureAlgorithm {
    /// Digest of one block.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> [u8; SUM_LENGTH] {
        match self {
            Self::Md4 => Md4::digest(data),
            Self::Md5 => Md5::digest(data),
        }
    }

    /// Digest of everything the reader yields, for whole-file checksums.
    ///
    /// # Errors
    ///
    /// Propagates any [`io::Error`] from the reader.
    pub fn digest_reader<R: Read>(self, reader: &mut R) -> io::Result<[u8; SUM_LENGTH]> {
        match self {
            Self::Md4 => Md4::digest_reader(reader),
            Self::Md5 => Md5::digest_reader(reader),
        }
    }
}

/// Signature of a single block of the stale copy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignatureBlock {
    /// 32-bit weak rolling checksum of the block.
    pub sum1: u32,
    /// Strong checksum, of which only the table's negotiated prefix is
    /// meaningful (the rest is zero).
    pub sum2: [u8; SUM_LENGTH],
    /// Byte offset of the block in the stale copy.
    pub offset: u64,
    /// Block length; equals the table's block length except for a short tail.
    pub len: u32,
    /// Index of the block within the table.
    pub index: u32,
}

/// Signature table describing one file's block decomposition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileSignature {
    block_len: NonZeroU32,
    remainder: u32,
    file_len: u64,
    sum2_len: ChecksumLength,
    blocks: Vec<SignatureBlock>,
}

impl FileSignature {
    /// Builds the signature table for `data` at the given block length.
    ///
    /// The strong digest of every block is computed in full with `algorithm`
    /// and truncated to `sum2_len` for storage, matching what travels on the
    /// wire.
    #[must_use]
    pub fn generate(
        data: &[u8],
        block_len: NonZeroU32,
        sum2_len: ChecksumLength,
        algorithm: SignatureAlgorithm,
    ) -> Self {
        let n = block_len.get() as usize;
        let remainder = (data.len() % n) as u32;

        let mut blocks = Vec::with_capacity(data.len().div_ceil(n));
        for (index, block) in data.chunks(n).enumerate() {
            let digest = algorithm.digest(block);
            let mut sum2 = [0u8; SUM_LENGTH];
            sum2[..sum2_len.get()].copy_from_slice(&digest[..sum2_len.get()]);

            blocks.push(SignatureBlock {
                sum1: RollingDigest::from_bytes(block).value(),
                sum2,
                offset: (index * n) as u64,
                len: block.len() as u32,
                index: index as u32,
            });
        }

        Self {
            block_len,
            remainder,
            file_len: data.len() as u64,
            sum2_len,
            blocks,
        }
    }

    /// An empty table: "send me the whole file as literals".
    #[must_use]
    pub fn empty(block_len: NonZeroU32, sum2_len: ChecksumLength) -> Self {
        Self {
            block_len,
            remainder: 0,
            file_len: 0,
            sum2_len,
            blocks: Vec::new(),
        }
    }

    /// Nominal block length `n`.
    #[must_use]
    pub fn block_len(&self) -> u32 {
        self.block_len.get()
    }

    /// Number of blocks.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.blocks.len() as u32
    }

    /// Length of the final block when it is short, else 0.
    #[must_use]
    pub fn remainder(&self) -> u32 {
        self.remainder
    }

    /// Total length of the described file.
    #[must_use]
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Negotiated strong-checksum truncation for this table.
    #[must_use]
    pub fn sum2_len(&self) -> ChecksumLength {
        self.sum2_len
    }

    /// Per-block signatures in index order.
    #[must_use]
    pub fn blocks(&self) -> &[SignatureBlock] {
        &self.blocks
    }

    /// The meaningful (truncated) strong-checksum prefix of block `index`.
    #[must_use]
    pub fn sum2_of(&self, index: u32) -> &[u8] {
        &self.blocks[index as usize].sum2[..self.sum2_len.get()]
    }

    /// Serialises the table as a signature packet.
    ///
    /// Wire shape: `count`, `n`, `remainder`, then per block the weak
    /// checksum (4 bytes LE) and the truncated strong checksum.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), WireError> {
        write_int(writer, self.count() as i32)?;
        write_int(writer, self.block_len() as i32)?;
        write_int(writer, self.remainder as i32)?;
        for block in &self.blocks {
            write_int(writer, block.sum1 as i32)?;
            write_buf(writer, &block.sum2[..self.sum2_len.get()])?;
        }
        Ok(())
    }

    /// Deserialises a signature packet.
    ///
    /// `offset` and `len` are reconstructed deterministically from the
    /// block index, `n`, `remainder` and `count`. Counts that cannot occur
    /// in a valid packet are framing violations.
    pub fn read_from<R: Read + ?Sized>(
        reader: &mut R,
        sum2_len: ChecksumLength,
    ) -> Result<Self, WireError> {
        let count = read_int(reader, "signature block count")?;
        let n = read_int(reader, "signature block length")?;
        let remainder = read_int(reader, "signature remainder")?;

        if count < 0 {
            return Err(WireError::Invalid {
                what: "signature block count",
                value: i64::from(count),
            });
        }
        let block_len = u32::try_from(n)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(WireError::Invalid {
                what: "signature block length",
                value: i64::from(n),
            })?;
        if remainder < 0 || remainder as u32 >= block_len.get() {
            return Err(WireError::Invalid {
                what: "signature remainder",
                value: i64::from(remainder),
            });
        }
        if count == 0 && remainder != 0 {
            return Err(WireError::Invalid {
                what: "signature remainder",
                value: i64::from(remainder),
            });
        }

        let count = count as u32;
        let remainder = remainder as u32;

        let mut blocks = Vec::new();
        let mut offset = 0u64;
        for index in 0..count {
            let sum1 = read_int(reader, "block weak checksum")? as u32;
            let mut sum2 = [0u8; SUM_LENGTH];
            read_buf(reader, &mut sum2[..sum2_len.get()], "block strong checksum")?;

            let len = if index == count - 1 && remainder != 0 {
                remainder
            } else {
                block_len.get()
            };
            blocks.push(SignatureBlock {
                sum1,
                sum2,
                offset,
                len,
                index,
            });
            offset += u64::from(len);
        }

        // offset now equals the stale file's total length; the last block
        // contributed `remainder` rather than `n` when the tail is short.
        Ok(Self {
            block_len,
            remainder,
            file_len: offset,
            sum2_len,
            blocks,
        })
    }
}
