use std::io;

use thiserror::Error;

/// Errors raised by the wire codec.
///
/// Everything here is a hard stop: the engine does not tolerate a corrupt
/// peer, so a framing violation aborts the transfer rather than resynchronise.
#[derive(Debug, Error)]
pub enum WireError {
    /// The stream ended in the middle of a frame.
    #[error("unexpected end of stream while reading {context}")]
    UnexpectedEof {
        /// What was being read when the stream ended.
        context: &'static str,
    },

    /// A peer sent a count or header that cannot occur in a valid stream.
    #[error("impossible {what} on the wire: {value}")]
    Invalid {
        /// Which field was out of range.
        what: &'static str,
        /// The offending value.
        value: i64,
    },

    /// Underlying transport failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl WireError {
    /// Wraps an I/O error, converting early EOF into a framing violation so
    /// callers see one error kind for truncated streams.
    #[must_use]
    pub fn from_io(err: io::Error, context: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof { context }
        } else {
            Self::Io(err)
        }
    }
}
