//! Primitive wire reads and writes.
//!
//! All integers on the channel are 32-bit two's-complement little-endian.
//! Byte buffers are fixed-length raw runs whose size is agreed out-of-band
//! (block counts, the negotiated checksum length), so there is no length
//! prefix at this layer.

use std::io::{Read, Write};

use crate::WireError;

/// Phase terminator in the index stream.
pub const END_OF_PHASE: i32 = -1;

/// Writes one little-endian `i32`.
pub fn write_int<W: Write + ?Sized>(writer: &mut W, value: i32) -> Result<(), WireError> {
    writer.write_all(&value.to_le_bytes()).map_err(WireError::Io)
}

/// Reads one little-endian `i32`.
pub fn read_int<R: Read + ?Sized>(
    reader: &mut R,
    context: &'static str,
) -> Result<i32, WireError> {
    let mut bytes = [0u8; 4];
    reader
        .read_exact(&mut bytes)
        .map_err(|err| WireError::from_io(err, context))?;
    Ok(i32::from_le_bytes(bytes))
}

/// Writes a fixed-length raw byte run.
pub fn write_buf<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> Result<(), WireError> {
    writer.write_all(buf).map_err(WireError::Io)
}

/// Reads exactly `buf.len()` raw bytes.
pub fn read_buf<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
    context: &'static str,
) -> Result<(), WireError> {
    reader
        .read_exact(buf)
        .map_err(|err| WireError::from_io(err, context))
}

/// Writes a file index, or [`END_OF_PHASE`] for `None`.
pub fn write_index<W: Write + ?Sized>(
    writer: &mut W,
    index: Option<u32>,
) -> Result<(), WireError> {
    let value = match index {
        Some(i) => i32::try_from(i).map_err(|_| WireError::Invalid {
            what: "file index",
            value: i64::from(i),
        })?,
        None => END_OF_PHASE,
    };
    write_int(writer, value)
}

/// Reads a file index; `Ok(None)` is the phase terminator.
///
/// Anything below `−1` cannot occur in a valid stream and is rejected.
pub fn read_index<R: Read + ?Sized>(reader: &mut R) -> Result<Option<u32>, WireError> {
    let value = read_int(reader, "file index")?;
    if value == END_OF_PHASE {
        return Ok(None);
    }
    u32::try_from(value).map(Some).map_err(|_| WireError::Invalid {
        what: "file index",
        value: i64::from(value),
    })
}
