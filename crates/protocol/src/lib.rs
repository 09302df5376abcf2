#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `protocol` owns everything two peers must agree on byte-for-byte: the
//! 32-bit little-endian integer encoding, the reconstruction token codec, the
//! index stream, the protocol version gate for the checksum-widening retry
//! phase, and the once-mutable negotiated strong-checksum length.
//!
//! The framing is deliberately rigid. A peer that emits an impossible count,
//! an out-of-range token header or a truncated integer is not negotiated
//! with; the violation surfaces as a [`WireError`] that the engine treats as
//! fatal.
//!
//! # Wire shapes
//!
//! - Integers: `i32`, two's-complement, little-endian.
//! - Token header `t`: `t > 0` announces `t` literal bytes (at most
//!   [`CHUNK_SIZE`]); `t < 0` references block `−(t+1)` of the receiver's
//!   stale copy; `t == 0` terminates the per-file stream.
//! - Index stream: `i >= 0` selects a file by list index; `−1` terminates a
//!   phase. Values below `−1` are violations.

mod error;
mod state;
pub mod token;
mod version;
pub mod wire;

pub use error::WireError;
pub use state::ChecksumLength;
pub use token::{CHUNK_SIZE, Token};
pub use version::ProtocolVersion;

/// Width of an untruncated strong checksum on the wire (MD4).
pub const SUM_LENGTH: usize = 16;

/// Smallest strong-checksum truncation a peer may request.
pub const CSUM_LENGTH_MIN: usize = 2;
