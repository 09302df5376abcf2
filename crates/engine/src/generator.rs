//! The generator: receiver-peer agent that decides, per file, whether and
//! how data must flow, and streams signature packets to the sender.

use std::fs::{self, DirBuilder, File};
use std::io::{self, BufWriter, Write};
use std::os::unix::fs::{DirBuilderExt, MetadataExt};
use std::path::{Path, PathBuf};

use flist::{FileEntry, FileList, FileMode, HardLinkMap};
use protocol::wire::write_index;
use protocol::ChecksumLength;
use signature::FileSignature;
use tracing::{debug, info, trace, warn};
use transfer::FileMap;

use crate::session::RedoReceiver;
use crate::{EngineError, SyncConfig};

/// Runs the generator over the whole file list.
///
/// Directories are created in a preliminary pass so parents exist before
/// their contents arrive. Every other entry goes through the per-file
/// classification of [`generate_for_entry`]. The list terminator `-1` closes
/// phase 1; with a redo-capable peer the checksum length is widened and the
/// receiver's re-request indices are replayed until its own terminator, then
/// a final `-1` closes the session.
pub fn generate_files<W: Write>(
    cfg: &SyncConfig,
    list: &FileList,
    dest_root: &Path,
    local_name: Option<&Path>,
    f_out: W,
    redo: &RedoReceiver,
) -> Result<(), EngineError> {
    let mut out = BufWriter::new(f_out);
    let mut csum_len = cfg.checksum_length();
    let hard_links = cfg
        .preserve_hard_links
        .then(|| HardLinkMap::build(list));

    debug!("generator starting count={}", list.len());

    for entry in list.files() {
        if !entry.mode.is_dir() || cfg.dry_run {
            continue;
        }
        let path = dest_root.join(&entry.name);
        let result = DirBuilder::new()
            .mode(entry.mode.permissions())
            .create(&path);
        if let Err(err) = result {
            if err.kind() != io::ErrorKind::AlreadyExists {
                warn!("mkdir {}: {err}", path.display());
            }
        }
    }

    for (index, entry) in list.files().iter().enumerate() {
        if entry.mode.is_dir() {
            continue;
        }
        let fname = dest_path(dest_root, local_name, entry);
        generate_for_entry(
            cfg,
            csum_len,
            index,
            entry,
            &fname,
            hard_links.as_ref(),
            &mut out,
        )?;
    }

    write_index(&mut out, None)?;
    out.flush().map_err(protocol::WireError::Io)?;

    if cfg.remote_version.supports_redo() {
        // Anything the truncated checksums let through gets redone at full
        // strength.
        csum_len.widen();

        while let Ok(Some(index)) = redo.recv() {
            let Some(entry) = list.get(index as usize) else {
                warn!("redo request for unknown index {index}");
                continue;
            };
            if entry.mode.is_dir() {
                continue;
            }
            let fname = dest_path(dest_root, local_name, entry);
            generate_for_entry(
                cfg,
                csum_len,
                index as usize,
                entry,
                &fname,
                hard_links.as_ref(),
                &mut out,
            )?;
        }

        write_index(&mut out, None)?;
        out.flush().map_err(protocol::WireError::Io)?;
    }

    debug!("generator finished");
    Ok(())
}

/// Classifies one entry and emits whatever the sender needs for it.
///
/// The order of checks mirrors the C reference: symlinks, device nodes and
/// hard-link aliases are settled locally; non-regular leftovers are skipped
/// with a warning; missing targets request the whole file via an empty
/// signature table; unchanged targets short-circuit to a metadata fixup.
fn generate_for_entry<W: Write>(
    cfg: &SyncConfig,
    csum_len: ChecksumLength,
    index: usize,
    entry: &FileEntry,
    fname: &Path,
    hard_links: Option<&HardLinkMap>,
    out: &mut W,
) -> Result<(), EngineError> {
    trace!("recv_generator({})", fname.display());

    let stat = fs::symlink_metadata(fname);

    if cfg.preserve_links && entry.mode.is_symlink() {
        generate_symlink(cfg, entry, fname, stat.as_ref().ok());
        return Ok(());
    }

    if cfg.preserve_devices && entry.mode.is_device() {
        generate_device(cfg, entry, fname, stat.as_ref().ok());
        return Ok(());
    }

    if let Some(map) = hard_links {
        if map.is_secondary(index, entry) {
            debug!("{} is a hard link", entry.name.display());
            return Ok(());
        }
    }

    if !entry.mode.is_regular() {
        warn!("skipping non-regular file {}", fname.display());
        return Ok(());
    }

    let st = match stat {
        Ok(st) => st,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            // No stale copy: ask for the whole file as literals.
            write_index(out, Some(index as u32))?;
            if !cfg.dry_run {
                FileSignature::empty(cfg.block_size, csum_len).write_to(out)?;
            }
            out.flush().map_err(protocol::WireError::Io)?;
            return Ok(());
        }
        Err(err) => {
            debug!("recv_generator cannot stat {}: {err}", fname.display());
            return Ok(());
        }
    };

    if !FileMode::new(st.mode()).is_regular() {
        warn!("{}: not a regular file", fname.display());
        return Ok(());
    }

    if cfg.update_only && st.mtime() >= entry.mtime {
        debug!("{} is newer", fname.display());
        return Ok(());
    }

    let local_sum = if cfg.always_checksum {
        match File::open(fname).and_then(|mut f| cfg.checksum_algorithm.digest_reader(&mut f)) {
            Ok(digest) => Some(digest),
            Err(err) => {
                warn!("cannot checksum {}: {err}", fname.display());
                None
            }
        }
    } else {
        None
    };

    let checksum_matches = match (local_sum, entry.checksum) {
        (Some(local), Some(expected)) => {
            local[..csum_len.get()] == expected[..csum_len.get()]
        }
        _ => false,
    };
    let unchanged = st.len() == entry.len
        && ((!cfg.ignore_times && st.mtime() == entry.mtime) || checksum_matches);
    if unchanged {
        apply_metadata(cfg, fname, entry, Some(&st), true);
        return Ok(());
    }

    if cfg.dry_run {
        write_index(out, Some(index as u32))?;
        return Ok(());
    }

    let file = match File::open(fname) {
        Ok(file) => file,
        Err(err) => {
            warn!("failed to open {}: {err}", fname.display());
            return Ok(());
        }
    };
    let map = match FileMap::new(&file) {
        Ok(map) => map,
        Err(err) => {
            warn!("failed to map {}: {err}", fname.display());
            return Ok(());
        }
    };
    trace!("mapped {} of size {}", fname.display(), map.len());

    let signature =
        FileSignature::generate(map.bytes(), cfg.block_size, csum_len, cfg.checksum_algorithm);
    write_index(out, Some(index as u32))?;
    signature.write_to(out)?;
    out.flush().map_err(protocol::WireError::Io)?;
    Ok(())
}

/// Symlink reconciliation: a correct link gets a metadata fixup; anything
/// else is replaced.
fn generate_symlink(
    cfg: &SyncConfig,
    entry: &FileEntry,
    fname: &Path,
    stat: Option<&fs::Metadata>,
) {
    let Some(target) = &entry.link_target else {
        warn!("symlink entry {} has no target", entry.name.display());
        return;
    };

    if let Some(st) = stat {
        if FileMode::new(st.mode()).is_symlink() {
            if let Ok(existing) = fs::read_link(fname) {
                if existing == *target {
                    apply_metadata(cfg, fname, entry, Some(st), true);
                    return;
                }
            }
        }
    }

    if cfg.dry_run {
        return;
    }
    if stat.is_some() {
        let _ = fs::remove_file(fname);
    }
    match std::os::unix::fs::symlink(target, fname) {
        Ok(()) => {
            apply_metadata(cfg, fname, entry, None, false);
            info!("{} -> {}", fname.display(), target.display());
        }
        Err(err) => {
            warn!("link {} -> {}: {err}", fname.display(), target.display());
        }
    }
}

/// Device-node reconciliation: recreate on mode or device-number mismatch.
fn generate_device(
    cfg: &SyncConfig,
    entry: &FileEntry,
    fname: &Path,
    stat: Option<&fs::Metadata>,
) {
    let matches = stat
        .map(|st| st.mode() == entry.mode.raw() && st.rdev() == entry.rdev)
        .unwrap_or(false);

    if matches {
        apply_metadata(cfg, fname, entry, stat, true);
        return;
    }

    if cfg.dry_run {
        return;
    }
    if stat.is_some() {
        let _ = fs::remove_file(fname);
    }
    trace!(
        "mknod({},{:o},{:x})",
        fname.display(),
        entry.mode.raw(),
        entry.rdev
    );
    match metadata::create_device(fname, entry.mode, entry.rdev) {
        Ok(()) => {
            apply_metadata(cfg, fname, entry, None, false);
            info!("{}", fname.display());
        }
        Err(err) => warn!("{err}"),
    }
}

/// Applies preserved metadata, downgrading failures to warnings: metadata
/// errors are report-only and never abort the session.
pub(crate) fn apply_metadata(
    cfg: &SyncConfig,
    fname: &Path,
    entry: &FileEntry,
    st: Option<&fs::Metadata>,
    report: bool,
) {
    if let Err(err) = metadata::apply(fname, entry, st, cfg.metadata_opts(), report) {
        warn!("{err}");
    }
}

/// Resolves the receiver-local path for an entry, honoring a caller-supplied
/// override used by single-file transfers.
pub(crate) fn dest_path(
    dest_root: &Path,
    local_name: Option<&Path>,
    entry: &FileEntry,
) -> PathBuf {
    dest_root.join(local_name.unwrap_or(&entry.name))
}
