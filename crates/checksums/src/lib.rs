#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` provides the two checksum families the delta engine is built
//! on:
//!
//! - [`rolling`] implements the 32-bit additive weak checksum used for block
//!   matching. Two 16-bit halves `s1` and `s2` accumulate the byte sum and
//!   the prefix sums respectively; the packed value `(s2 << 16) | s1` is what
//!   travels inside signature packets. The function is wire-visible: both
//!   peers must compute identical bits for any byte range.
//! - [`strong`] exposes streaming MD4 and MD5 digests behind the
//!   [`strong::StrongDigest`] trait. MD4 is the engine's strong checksum; its
//!   16-byte output is truncated to the negotiated length on the wire.
//!
//! # Invariants
//!
//! - Both halves of the rolling state are truncated to 16 bits after every
//!   update, so the packed value is stable regardless of how the bytes were
//!   fed in (single block, incremental rolls, or window shrinks).
//! - For every byte range, the value obtained by incremental updates
//!   ([`RollingChecksum::roll`], [`RollingChecksum::shift_out`]) equals the
//!   value obtained by a from-scratch [`RollingChecksum::update`] over the
//!   same range.
//!
//! # Errors
//!
//! [`RollingError`] reports invalid rolling operations (empty windows or
//! window lengths that overflow `u32`). Strong digests stream data
//! incrementally and never fail.

mod rolling;
pub mod strong;

pub use rolling::{RollingChecksum, RollingDigest, RollingError};
