#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `matching` is the sender-side heart of the delta engine: a single
//! left-to-right scan of the authoritative file against the signature table
//! of the receiver's stale copy, emitting a token stream of literal runs and
//! block references.
//!
//! The scan keeps a rolling weak checksum over a window of the nominal block
//! length. Whenever the weak value hits the signature hash table, candidate
//! blocks are verified with the truncated strong checksum; a verified match
//! flushes the pending literal run, emits a block reference and jumps the
//! window past the matched bytes. A miss slides the window one byte. Tail
//! windows shorter than the block length still participate, shrinking as the
//! scan approaches end of file.
//!
//! Ties go to the first candidate in table order, so identical blocks always
//! resolve to the lowest block index.

use std::io::Write;

use checksums::RollingChecksum;
use protocol::{token, WireError};
use rustc_hash::FxHashMap;
use signature::{FileSignature, SignatureAlgorithm};
use tracing::trace;

/// Hash table over a signature's weak checksums.
///
/// Buckets preserve table order so the first candidate that also passes the
/// strong check wins ties deterministically.
#[derive(Debug)]
pub struct SignatureIndex<'a> {
    signature: &'a FileSignature,
    buckets: FxHashMap<u32, Vec<u32>>,
}

impl<'a> SignatureIndex<'a> {
    /// Builds the lookup table for `signature`.
    #[must_use]
    pub fn build(signature: &'a FileSignature) -> Self {
        let mut buckets: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        for block in signature.blocks() {
            buckets.entry(block.sum1).or_default().push(block.index);
        }
        Self { signature, buckets }
    }

    /// Candidate block indices whose weak checksum equals `sum1`.
    #[must_use]
    pub fn candidates(&self, sum1: u32) -> &[u32] {
        self.buckets.get(&sum1).map_or(&[], Vec::as_slice)
    }

    /// The signature this index was built over.
    #[must_use]
    pub fn signature(&self) -> &FileSignature {
        self.signature
    }
}

/// Byte accounting for one matcher pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DeltaStats {
    /// Bytes shipped verbatim.
    pub literal_bytes: u64,
    /// Bytes covered by block references.
    pub matched_bytes: u64,
    /// Number of block references emitted.
    pub matches: u64,
}

/// Scans `src` against `signature` and writes the reconstruction token
/// stream, terminator included.
///
/// `algorithm` must be the strong-checksum algorithm the signature table was
/// generated with; it is negotiated out-of-band alongside the truncation.
/// An empty signature table short-circuits to one pass of literal tokens:
/// that is how a receiver without a stale copy requests the whole file.
///
/// # Errors
///
/// Propagates wire-level write failures; the scan itself cannot fail.
pub fn generate_delta<W: Write + ?Sized>(
    src: &[u8],
    signature: &FileSignature,
    algorithm: SignatureAlgorithm,
    out: &mut W,
) -> Result<DeltaStats, WireError> {
    let mut stats = DeltaStats::default();
    let m = src.len();

    if signature.count() == 0 || m == 0 {
        token::write_literal(out, src)?;
        stats.literal_bytes = m as u64;
        token::write_end(out)?;
        return Ok(stats);
    }

    let index = SignatureIndex::build(signature);
    let n = signature.block_len() as usize;
    let sum2_len = signature.sum2_len().get();

    let mut weak = RollingChecksum::new();
    weak.update(&src[..n.min(m)]);

    let mut p = 0usize;
    let mut last_match = 0usize;

    while p < m {
        let win = n.min(m - p);

        // The strong digest for this window is computed at most once, no
        // matter how many weak-checksum candidates collide here.
        let mut strong: Option<[u8; 16]> = None;
        let mut matched = None;
        for &j in index.candidates(weak.value()) {
            let block = &signature.blocks()[j as usize];
            if block.len as usize != win {
                continue;
            }
            let digest = strong.get_or_insert_with(|| algorithm.digest(&src[p..p + win]));
            if &digest[..sum2_len] == signature.sum2_of(j) {
                matched = Some(j);
                break;
            }
        }

        if let Some(j) = matched {
            trace!(offset = p, block = j, len = win, "block match");
            token::write_literal(out, &src[last_match..p])?;
            stats.literal_bytes += (p - last_match) as u64;
            token::write_block_ref(out, j)?;
            stats.matched_bytes += win as u64;
            stats.matches += 1;

            p += win;
            last_match = p;
            if p < m {
                weak.update_from_block(&src[p..p + n.min(m - p)]);
            }
        } else {
            let outgoing = src[p];
            if p + win < m {
                weak.roll(outgoing, src[p + win])
                    .expect("scan window is never empty");
            } else {
                weak.shift_out(outgoing).expect("scan window is never empty");
            }
            p += 1;
        }
    }

    token::write_literal(out, &src[last_match..m])?;
    stats.literal_bytes += (m - last_match) as u64;
    token::write_end(out)?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use protocol::token::{read_token, Token};
    use protocol::ChecksumLength;
    use std::io::Cursor;
    use std::num::NonZeroU32;

    fn sig(data: &[u8], n: u32, csum: usize) -> FileSignature {
        FileSignature::generate(
            data,
            NonZeroU32::new(n).unwrap(),
            ChecksumLength::new(csum),
            SignatureAlgorithm::Md4,
        )
    }

    fn tokens(buf: Vec<u8>) -> Vec<Token> {
        let mut cursor = Cursor::new(buf);
        let mut out = Vec::new();
        loop {
            let token = read_token(&mut cursor).unwrap();
            let done = token == Token::End;
            out.push(token);
            if done {
                return out;
            }
        }
    }

    /// Replays a token stream against the stale copy it references.
    fn apply(old: &[u8], signature: &FileSignature, stream: Vec<u8>) -> Vec<u8> {
        let n = signature.block_len() as usize;
        let count = signature.count();
        let remainder = signature.remainder() as usize;
        let mut out = Vec::new();
        for token in tokens(stream) {
            match token {
                Token::Literal(data) => out.extend_from_slice(&data),
                Token::BlockRef(j) => {
                    let len = if j == count - 1 && remainder != 0 {
                        remainder
                    } else {
                        n
                    };
                    let off = j as usize * n;
                    out.extend_from_slice(&old[off..off + len]);
                }
                Token::End => {}
            }
        }
        out
    }

    #[test]
    fn missing_basis_sends_whole_file_as_literals() {
        let signature = FileSignature::empty(
            NonZeroU32::new(4).unwrap(),
            ChecksumLength::new(2),
        );
        let mut buf = Vec::new();
        let stats = generate_delta(b"hello", &signature, SignatureAlgorithm::Md4, &mut buf).unwrap();

        assert_eq!(
            tokens(buf),
            vec![Token::Literal(b"hello".to_vec()), Token::End]
        );
        assert_eq!(stats.literal_bytes, 5);
        assert_eq!(stats.matches, 0);
    }

    #[test]
    fn identical_files_transfer_no_literals() {
        let data = b"abcdefgh";
        let signature = sig(data, 4, 2);
        let mut buf = Vec::new();
        let stats = generate_delta(data, &signature, SignatureAlgorithm::Md4, &mut buf).unwrap();

        assert_eq!(
            tokens(buf),
            vec![Token::BlockRef(0), Token::BlockRef(1), Token::End]
        );
        assert_eq!(stats.literal_bytes, 0);
        assert_eq!(stats.matched_bytes, 8);
    }

    #[test]
    fn changed_tail_block_becomes_a_literal() {
        let signature = sig(b"AAAAAAAA", 4, 2);
        let mut buf = Vec::new();
        generate_delta(b"AAAAZZZZ", &signature, SignatureAlgorithm::Md4, &mut buf).unwrap();

        assert_eq!(
            tokens(buf),
            vec![
                Token::BlockRef(0),
                Token::Literal(b"ZZZZ".to_vec()),
                Token::End
            ]
        );
    }

    #[test]
    fn shifted_blocks_resolve_to_references_only() {
        let signature = sig(b"XXXXABCD", 4, 2);
        let mut buf = Vec::new();
        let stats = generate_delta(b"ABCDXXXX", &signature, SignatureAlgorithm::Md4, &mut buf).unwrap();

        assert_eq!(
            tokens(buf),
            vec![Token::BlockRef(1), Token::BlockRef(0), Token::End]
        );
        assert_eq!(stats.literal_bytes, 0);
    }

    #[test]
    fn short_tail_window_still_matches() {
        // 10 bytes at block length 4: the final 2-byte window must match
        // against the remainder block.
        let data = b"0123456789";
        let signature = sig(data, 4, 2);
        let mut buf = Vec::new();
        let stats = generate_delta(data, &signature, SignatureAlgorithm::Md4, &mut buf).unwrap();

        assert_eq!(
            tokens(buf),
            vec![
                Token::BlockRef(0),
                Token::BlockRef(1),
                Token::BlockRef(2),
                Token::End
            ]
        );
        assert_eq!(stats.matched_bytes, 10);
    }

    #[test]
    fn identical_blocks_tie_break_to_lowest_index() {
        let signature = sig(b"AAAAAAAA", 4, 2);
        let mut buf = Vec::new();
        generate_delta(b"AAAA", &signature, SignatureAlgorithm::Md4, &mut buf).unwrap();

        assert_eq!(tokens(buf), vec![Token::BlockRef(0), Token::End]);
    }

    #[test]
    fn weak_match_without_strong_match_is_rejected() {
        // Forge a packet whose weak checksum matches the scanned window but
        // whose strong checksum cannot.
        let src = b"evil";
        let weak = checksums::RollingDigest::from_bytes(src).value();
        let mut packet = Vec::new();
        protocol::wire::write_int(&mut packet, 1).unwrap();
        protocol::wire::write_int(&mut packet, 4).unwrap();
        protocol::wire::write_int(&mut packet, 0).unwrap();
        protocol::wire::write_int(&mut packet, weak as i32).unwrap();
        packet.extend_from_slice(&[0xde, 0xad]);

        let signature =
            FileSignature::read_from(&mut Cursor::new(packet), ChecksumLength::new(2)).unwrap();

        let mut buf = Vec::new();
        let stats = generate_delta(src, &signature, SignatureAlgorithm::Md4, &mut buf).unwrap();
        assert_eq!(
            tokens(buf),
            vec![Token::Literal(b"evil".to_vec()), Token::End]
        );
        assert_eq!(stats.matches, 0);
    }

    #[test]
    fn md5_signatures_verify_under_md5_scanning() {
        let data = b"abcdefgh";
        let signature = FileSignature::generate(
            data,
            NonZeroU32::new(4).unwrap(),
            ChecksumLength::new(16),
            SignatureAlgorithm::Md5,
        );
        let mut buf = Vec::new();
        let stats =
            generate_delta(data, &signature, SignatureAlgorithm::Md5, &mut buf).unwrap();

        assert_eq!(
            tokens(buf),
            vec![Token::BlockRef(0), Token::BlockRef(1), Token::End]
        );
        assert_eq!(stats.literal_bytes, 0);
    }

    #[test]
    fn interleaved_edit_produces_mixed_stream() {
        let old = b"aaaabbbbccccdddd";
        let new = b"aaaaXXbbbbccccdddd";
        let signature = sig(old, 4, 8);
        let mut buf = Vec::new();
        generate_delta(new, &signature, SignatureAlgorithm::Md4, &mut buf).unwrap();
        assert_eq!(apply(old, &signature, buf), new);
    }

    proptest! {
        /// One full matcher pass reconstructs the new file exactly, for any
        /// old/new pair and block length.
        #[test]
        fn reconstruction_is_exact(
            old in proptest::collection::vec(any::<u8>(), 0..200),
            new in proptest::collection::vec(any::<u8>(), 0..200),
            n in 1u32..16,
        ) {
            let signature = sig(&old, n, 16);
            let mut buf = Vec::new();
            generate_delta(&new, &signature, SignatureAlgorithm::Md4, &mut buf).unwrap();
            prop_assert_eq!(apply(&old, &signature, buf), new);
        }

        /// Scanning a file against its own signature never ships literals.
        #[test]
        fn self_scan_is_all_references(
            data in proptest::collection::vec(any::<u8>(), 1..200),
            n in 1u32..16,
        ) {
            let signature = sig(&data, n, 16);
            let mut buf = Vec::new();
            let stats = generate_delta(&data, &signature, SignatureAlgorithm::Md4, &mut buf).unwrap();
            prop_assert_eq!(stats.literal_bytes, 0);
            prop_assert_eq!(stats.matched_bytes, data.len() as u64);
        }
    }
}
