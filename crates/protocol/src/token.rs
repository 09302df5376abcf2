//! Reconstruction token codec.
//!
//! A per-file token stream intermixes literal runs with references into the
//! receiver's own stale copy, terminated by a zero header. The header is one
//! wire integer `t`:
//!
//! - `t > 0`: `t` literal bytes follow verbatim.
//! - `t < 0`: splice in block `−(t+1)` of the stale copy.
//! - `t == 0`: end of this file's stream.
//!
//! Senders never emit a literal token longer than [`CHUNK_SIZE`]; a header
//! announcing more is an impossible count and rejected on read.

use std::io::{Read, Write};

use crate::WireError;
use crate::wire::{read_int, write_int};

/// Upper bound for one literal token's payload.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// One decoded reconstruction token.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    /// A run of literal bytes to copy verbatim into the output.
    Literal(Vec<u8>),
    /// A reference to a block of the receiver's stale copy.
    BlockRef(u32),
    /// Terminator for the per-file stream.
    End,
}

/// Writes a literal run, splitting it into ≤ [`CHUNK_SIZE`] tokens.
///
/// Empty runs produce no token at all.
pub fn write_literal<W: Write + ?Sized>(writer: &mut W, data: &[u8]) -> Result<(), WireError> {
    for chunk in data.chunks(CHUNK_SIZE) {
        write_int(writer, chunk.len() as i32)?;
        writer.write_all(chunk).map_err(WireError::Io)?;
    }
    Ok(())
}

/// Writes a reference to stale-copy block `index`.
pub fn write_block_ref<W: Write + ?Sized>(writer: &mut W, index: u32) -> Result<(), WireError> {
    let header = i32::try_from(index)
        .ok()
        .and_then(i32::checked_neg)
        .and_then(|negated| negated.checked_sub(1))
        .ok_or(WireError::Invalid {
            what: "block reference",
            value: i64::from(index),
        })?;
    write_int(writer, header)
}

/// Writes the per-file terminator.
pub fn write_end<W: Write + ?Sized>(writer: &mut W) -> Result<(), WireError> {
    write_int(writer, 0)
}

/// Reads the next token from the stream.
pub fn read_token<R: Read + ?Sized>(reader: &mut R) -> Result<Token, WireError> {
    let header = read_int(reader, "token header")?;
    if header == 0 {
        return Ok(Token::End);
    }
    if header < 0 {
        // -(t+1) recovers the block index; i32::MIN has no negation but
        // still decodes, via the +1 first.
        let index = -(header + 1);
        return Ok(Token::BlockRef(index as u32));
    }

    let len = header as usize;
    if len > CHUNK_SIZE {
        return Err(WireError::Invalid {
            what: "literal token length",
            value: i64::from(header),
        });
    }
    let mut data = vec![0u8; len];
    reader
        .read_exact(&mut data)
        .map_err(|err| WireError::from_io(err, "literal token payload"))?;
    Ok(Token::Literal(data))
}
