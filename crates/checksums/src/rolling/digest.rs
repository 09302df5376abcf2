use super::checksum::RollingChecksum;

/// Captured rolling checksum state.
///
/// Signature packets carry the packed 32-bit value; the block length is
/// transmitted separately, so the caller supplies it when reconstructing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RollingDigest {
    s1: u16,
    s2: u16,
    len: usize,
}

impl RollingDigest {
    /// Digest representing an empty window.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Creates a digest from individual components.
    #[must_use]
    pub const fn new(sum1: u16, sum2: u16, len: usize) -> Self {
        Self {
            s1: sum1,
            s2: sum2,
            len,
        }
    }

    /// Computes the digest for the provided byte slice.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut checksum = RollingChecksum::new();
        checksum.update(bytes);
        checksum.digest()
    }

    /// Constructs a digest from the packed 32-bit wire representation.
    #[must_use]
    pub const fn from_value(value: u32, len: usize) -> Self {
        Self {
            s1: value as u16,
            s2: (value >> 16) as u16,
            len,
        }
    }

    /// Returns the packed 32-bit representation `(s2 << 16) | s1`.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u32 {
        ((self.s2 as u32) << 16) | (self.s1 as u32)
    }

    /// Length of the data that contributed to the digest.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.len
    }

    /// Returns whether the digest was computed from zero bytes.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    /// First 16-bit component (`s1`, the byte sum).
    #[inline]
    #[must_use]
    pub const fn sum1(self) -> u16 {
        self.s1
    }

    /// Second 16-bit component (`s2`, the prefix sum).
    #[inline]
    #[must_use]
    pub const fn sum2(self) -> u16 {
        self.s2
    }
}

impl Default for RollingDigest {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<RollingDigest> for u32 {
    #[inline]
    fn from(digest: RollingDigest) -> Self {
        digest.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_round_trips_through_from_value() {
        let original = RollingDigest::new(0xabcd, 0xef01, 256);
        let reconstructed = RollingDigest::from_value(original.value(), 256);
        assert_eq!(original, reconstructed);
    }

    #[test]
    fn value_packs_s2_high() {
        let digest = RollingDigest::new(0x1234, 0x5678, 100);
        assert_eq!(digest.value(), 0x5678_1234);
    }

    #[test]
    fn from_bytes_matches_manual_computation() {
        let data = b"hello world";
        let digest = RollingDigest::from_bytes(data);
        let mut checksum = RollingChecksum::new();
        checksum.update(data);
        assert_eq!(digest, checksum.digest());
        assert_eq!(digest.len(), data.len());
    }

    #[test]
    fn empty_input_yields_zero() {
        assert_eq!(RollingDigest::from_bytes(b""), RollingDigest::ZERO);
        assert!(RollingDigest::default().is_empty());
    }
}
