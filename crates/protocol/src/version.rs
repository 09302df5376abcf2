use std::fmt;

/// Negotiated protocol version of the remote peer.
///
/// The version is agreed before the delta exchange starts (by the external
/// handshake collaborator); the engine only consults it to gate the
/// checksum-widening retry phase.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(u32);

impl ProtocolVersion {
    /// Oldest version that understands the phase-2 retry exchange.
    pub const REDO_PHASE_MIN: Self = Self(13);

    /// Creates a version from its raw numeric form.
    #[must_use]
    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    /// Raw numeric form.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether the peer understands the second, full-strength checksum pass.
    #[must_use]
    pub const fn supports_redo(self) -> bool {
        self.0 >= Self::REDO_PHASE_MIN.0
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProtocolVersion {
    fn from(version: u32) -> Self {
        Self::new(version)
    }
}
