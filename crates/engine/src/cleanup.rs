//! Interrupt handling.
//!
//! The C reference unlinked its in-progress temp file from a signal handler
//! via a module-level pointer. Here the temp file is a scoped guard owned by
//! the receiver ([`transfer::TempFile`]), so cancellation only needs a flag:
//! a signal handler (installed by the embedding application) calls
//! [`request_interrupt`], the drivers poll the flag at safe points, and the
//! resulting [`EngineError::Interrupted`] unwinds through the guard, which
//! reaps the temp file on drop.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::EngineError;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Flags the session for cancellation. Safe to call from a signal handler.
pub fn request_interrupt() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Whether cancellation has been requested.
#[must_use]
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Clears the flag. Intended for embedders that run several sessions in one
/// process, and for tests.
pub fn reset_interrupt() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

/// Driver-side safe point.
pub(crate) fn check_interrupt() -> Result<(), EngineError> {
    if interrupted() {
        Err(EngineError::Interrupted)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_round_trips() {
        reset_interrupt();
        assert!(!interrupted());
        assert!(check_interrupt().is_ok());

        request_interrupt();
        assert!(interrupted());
        assert!(matches!(check_interrupt(), Err(EngineError::Interrupted)));

        reset_interrupt();
        assert!(!interrupted());
    }
}
