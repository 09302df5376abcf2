use crate::{CSUM_LENGTH_MIN, SUM_LENGTH};

/// The negotiated strong-checksum truncation length.
///
/// This is the one piece of protocol state that changes mid-session: phase 1
/// runs with a truncated strong checksum, and if the peers enter the retry
/// phase every driver widens its copy to the full digest width. [`widen`]
/// is the only mutator, so the "mutable exactly once" rule is enforced by
/// construction.
///
/// [`widen`]: ChecksumLength::widen
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChecksumLength(usize);

impl ChecksumLength {
    /// Full, untruncated width.
    pub const FULL: Self = Self(SUM_LENGTH);

    /// Creates a length clamped to the legal range.
    #[must_use]
    pub const fn new(len: usize) -> Self {
        if len < CSUM_LENGTH_MIN {
            Self(CSUM_LENGTH_MIN)
        } else if len > SUM_LENGTH {
            Self(SUM_LENGTH)
        } else {
            Self(len)
        }
    }

    /// Current truncation in bytes.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Raises the truncation to the full digest width (phase 2).
    pub const fn widen(&mut self) {
        self.0 = SUM_LENGTH;
    }

    /// Whether no truncation is in effect.
    #[must_use]
    pub const fn is_full(self) -> bool {
        self.0 == SUM_LENGTH
    }
}

impl Default for ChecksumLength {
    fn default() -> Self {
        Self::new(CSUM_LENGTH_MIN)
    }
}
