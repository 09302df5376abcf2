use std::io;
use std::path::PathBuf;

use protocol::WireError;
use thiserror::Error;

/// Fatal engine failures.
///
/// Everything representable here aborts the session: framing violations,
/// write failures mid-reconstruction, and interrupts. Per-file soft failures
/// (unreadable sources, non-regular targets, metadata errors) are reported
/// and skipped inside the drivers and never surface as values of this type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The peer violated the wire framing.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Writing reconstructed data failed.
    #[error("write failed on {path}: {source}")]
    WriteFailed {
        /// Output file being reconstructed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// A file operation the protocol cannot continue without failed.
    #[error("{context} {path}: {source}")]
    File {
        /// What was being attempted.
        context: &'static str,
        /// The path involved.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The receiver found something other than a regular file where its
    /// stale copy should be.
    #[error("{path}: not a regular file")]
    NotRegular {
        /// The offending path.
        path: PathBuf,
    },

    /// The session was interrupted.
    #[error("transfer interrupted")]
    Interrupted,

    /// A peer agent thread panicked.
    #[error("peer agent thread panicked")]
    AgentPanic,
}

impl EngineError {
    /// The process exit code this failure maps to.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        ExitCode::Fatal
    }
}

/// Process exit codes of the engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    /// Clean completion.
    Ok = 0,
    /// Fatal write error, framing violation or interrupt, after cleanup.
    Fatal = 1,
}

impl ExitCode {
    /// Numeric form for `std::process::exit`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Maps a session result onto its exit code.
    #[must_use]
    pub fn from_result<T>(result: &Result<T, EngineError>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(err) => err.exit_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_zero_and_one() {
        assert_eq!(ExitCode::Ok.as_i32(), 0);
        assert_eq!(ExitCode::Fatal.as_i32(), 1);
    }

    #[test]
    fn every_engine_error_is_fatal() {
        let err = EngineError::Interrupted;
        assert_eq!(err.exit_code(), ExitCode::Fatal);
        assert_eq!(ExitCode::from_result(&Err::<(), _>(err)), ExitCode::Fatal);
        assert_eq!(ExitCode::from_result(&Ok::<_, EngineError>(())), ExitCode::Ok);
    }
}
