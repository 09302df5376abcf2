use std::num::NonZeroU32;

use metadata::MetadataOpts;
use protocol::{ChecksumLength, ProtocolVersion};
use signature::SignatureAlgorithm;

/// Immutable configuration threaded through all three drivers.
///
/// This replaces the C reference's process-wide flag globals with one value
/// the caller builds up front. The only piece of state that changes during a
/// session is the negotiated checksum length, which each driver copies out
/// via [`checksum_length`](Self::checksum_length) and widens locally at the
/// phase-1 → phase-2 transition.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Nominal block length used when generating signatures.
    pub block_size: NonZeroU32,
    /// Strong-checksum truncation for phase 1, in bytes.
    pub csum_length: usize,
    /// Strong-checksum algorithm for block and whole-file digests. Agreed
    /// out-of-band; both peers must use the same one.
    pub checksum_algorithm: SignatureAlgorithm,
    /// Skip targets whose mtime is at or beyond the entry's.
    pub update_only: bool,
    /// Never use mtime equality alone to judge identity.
    pub ignore_times: bool,
    /// Additionally judge identity by whole-file strong digest.
    pub always_checksum: bool,
    /// Restore modification times.
    pub preserve_times: bool,
    /// Restore permission bits.
    pub preserve_perms: bool,
    /// Restore file owners.
    pub preserve_uid: bool,
    /// Restore file groups.
    pub preserve_gid: bool,
    /// Recreate symlinks.
    pub preserve_links: bool,
    /// Recreate device nodes.
    pub preserve_devices: bool,
    /// Defer hard-link aliases to the hard-link handler.
    pub preserve_hard_links: bool,
    /// Displace targets to a backup name before replacing them.
    pub make_backups: bool,
    /// Suffix appended to displaced targets.
    pub backup_suffix: String,
    /// Perform the protocol exchange but mutate nothing.
    pub dry_run: bool,
    /// Whole-tree transfer; also required for deletion reconciliation.
    pub recurse: bool,
    /// Remove receiver-side files absent from the authoritative list.
    pub delete_mode: bool,
    /// Forwarded to the exclude-pattern collaborator when enumerating for
    /// deletion; the engine itself carries no pattern matcher.
    pub cvs_exclude: bool,
    /// Negotiated protocol version of the remote peer; gates phase 2.
    pub remote_version: ProtocolVersion,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            block_size: NonZeroU32::new(700).expect("default block size is non-zero"),
            csum_length: protocol::CSUM_LENGTH_MIN,
            checksum_algorithm: SignatureAlgorithm::default(),
            update_only: false,
            ignore_times: false,
            always_checksum: false,
            preserve_times: false,
            preserve_perms: false,
            preserve_uid: false,
            preserve_gid: false,
            preserve_links: false,
            preserve_devices: false,
            preserve_hard_links: false,
            make_backups: false,
            backup_suffix: "~".to_owned(),
            dry_run: false,
            recurse: false,
            delete_mode: false,
            cvs_exclude: false,
            remote_version: ProtocolVersion::REDO_PHASE_MIN,
        }
    }
}

impl SyncConfig {
    /// The phase-1 checksum truncation as negotiated state.
    #[must_use]
    pub fn checksum_length(&self) -> ChecksumLength {
        ChecksumLength::new(self.csum_length)
    }

    /// The metadata axes the receiver peer restores.
    #[must_use]
    pub fn metadata_opts(&self) -> MetadataOpts {
        MetadataOpts {
            preserve_times: self.preserve_times,
            preserve_perms: self.preserve_perms,
            preserve_uid: self.preserve_uid,
            preserve_gid: self.preserve_gid,
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_settings() {
        let cfg = SyncConfig::default();
        assert_eq!(cfg.block_size.get(), 700);
        assert_eq!(cfg.csum_length, 2);
        assert_eq!(cfg.checksum_algorithm, SignatureAlgorithm::Md4);
        assert_eq!(cfg.backup_suffix, "~");
        assert!(cfg.remote_version.supports_redo());
    }

    #[test]
    fn checksum_length_clamps_to_wire_range() {
        let cfg = SyncConfig {
            csum_length: 99,
            ..SyncConfig::default()
        };
        assert!(cfg.checksum_length().is_full());
    }
}
