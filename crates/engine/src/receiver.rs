//! The receiver: receiver-peer agent that rebuilds files from token streams
//! and swaps them into place.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use flist::{FileList, FileMode};
use protocol::token::{read_token, Token};
use protocol::wire::{read_index, read_int};
use protocol::WireError;
use tracing::{debug, info, trace, warn};
use transfer::{FileMap, SparseWriteState, TempFile};

use crate::cleanup::check_interrupt;
use crate::delete::delete_files;
use crate::generator::{apply_metadata, dest_path};
use crate::session::RedoSender;
use crate::{EngineError, SyncConfig};

/// Runs the receiver until both phases are terminated.
///
/// Files arrive in exactly the order the generator requested them. Each one
/// is rebuilt into a `<target>.XXXXXX` temp file (the cleanup guard), then
/// renamed over the target; a write failure is fatal and leaves no temp
/// behind. Deletion reconciliation, when configured, runs before any data
/// arrives so a file that is both extraneous and re-added cannot race.
pub fn receive_files<R: Read>(
    cfg: &SyncConfig,
    list: &FileList,
    dest_root: &Path,
    local_name: Option<&Path>,
    f_in: R,
    redo: &RedoSender,
) -> Result<(), EngineError> {
    let mut input = BufReader::new(f_in);
    let mut phase = 0;

    debug!("recv_files({}) starting", list.len());

    if cfg.recurse && cfg.delete_mode && local_name.is_none() && !list.is_empty() {
        delete_files(cfg, list, dest_root);
    }

    loop {
        check_interrupt()?;

        let index = match read_index(&mut input)? {
            Some(index) => index,
            None => {
                if phase == 0 && cfg.remote_version.supports_redo() {
                    phase = 1;
                    // Nothing tracks per-file failures, so no re-requests are
                    // issued; just close our side of the redo stream.
                    let _ = redo.send(None);
                    debug!("recv_files entering full-checksum phase");
                    continue;
                }
                break;
            }
        };

        let entry = list.get(index as usize).ok_or(WireError::Invalid {
            what: "file index",
            value: i64::from(index),
        })?;
        let fname = dest_path(dest_root, local_name, entry);

        if cfg.dry_run {
            info!("{}", fname.display());
            continue;
        }
        trace!("recv_files({})", fname.display());

        // Map the stale copy for block-reference resolution, when a regular,
        // non-empty one exists.
        let basis_file = File::open(&fname).ok();
        let basis = match &basis_file {
            Some(file) => {
                let st = file.metadata().map_err(|source| EngineError::File {
                    context: "fstat",
                    path: fname.clone(),
                    source,
                })?;
                if !FileMode::new(st.mode()).is_regular() {
                    return Err(EngineError::NotRegular { path: fname });
                }
                if st.len() > 0 {
                    Some(FileMap::new(file).map_err(|source| EngineError::File {
                        context: "cannot map",
                        path: fname.clone(),
                        source,
                    })?)
                } else {
                    None
                }
            }
            None => None,
        };
        trace!(
            "mapped basis of {} bytes",
            basis.as_ref().map_or(0, FileMap::len)
        );

        let (mut out_file, temp) = TempFile::create(&fname, entry.mode.permissions())
            .map_err(|source| EngineError::File {
                context: "cannot create temp file for",
                path: fname.clone(),
                source,
            })?;

        info!("{}", fname.display());

        receive_data(&mut input, basis.as_ref(), &mut out_file, &fname)?;

        drop(out_file);
        drop(basis);
        drop(basis_file);

        if cfg.make_backups {
            transfer::make_backup(&fname, &cfg.backup_suffix).map_err(|source| {
                EngineError::File {
                    context: "backup rename failed for",
                    path: fname.clone(),
                    source,
                }
            })?;
        }

        trace!("renaming {} to {}", temp.path().display(), fname.display());
        if let Err(err) = temp.persist(&fname) {
            // Target keeps its prior content; the guard reaped the temp.
            warn!("rename to {}: {err}", fname.display());
            continue;
        }

        apply_metadata(cfg, &fname, entry, None, false);
    }

    debug!("recv_files finished");
    Ok(())
}

/// Consumes one file's token stream into `out`.
///
/// The stream opens with the `count`, `n`, `remainder` echo of the signature
/// the generator sent for this index; block references are resolved against
/// those values and bounds-checked against the basis map. Zero runs pass
/// through the sparse writer so holes stay holes.
fn receive_data<R: Read>(
    input: &mut R,
    basis: Option<&FileMap>,
    out: &mut File,
    fname: &Path,
) -> Result<(), EngineError> {
    let count = read_int(input, "reconstruction block count")?;
    let n = read_int(input, "reconstruction block length")?;
    let remainder = read_int(input, "reconstruction remainder")?;

    if count < 0 {
        return Err(WireError::Invalid {
            what: "reconstruction block count",
            value: i64::from(count),
        }
        .into());
    }
    if n <= 0 {
        return Err(WireError::Invalid {
            what: "reconstruction block length",
            value: i64::from(n),
        }
        .into());
    }
    if remainder < 0 || remainder >= n {
        return Err(WireError::Invalid {
            what: "reconstruction remainder",
            value: i64::from(remainder),
        }
        .into());
    }
    let count = count as u32;
    let n = n as u32;
    let remainder = remainder as u32;

    let write_failed = |source: io::Error| EngineError::WriteFailed {
        path: fname.to_path_buf(),
        source,
    };

    let mut sparse = SparseWriteState::new();
    let mut offset = 0u64;

    loop {
        check_interrupt()?;

        match read_token(input)? {
            Token::End => break,
            Token::Literal(data) => {
                trace!("data recv {} at {offset}", data.len());
                sparse.write(out, &data).map_err(write_failed)?;
                offset += data.len() as u64;
            }
            Token::BlockRef(block) => {
                if block >= count {
                    return Err(WireError::Invalid {
                        what: "block reference",
                        value: i64::from(block),
                    }
                    .into());
                }
                let len = if block == count - 1 && remainder != 0 {
                    remainder
                } else {
                    n
                };
                let block_offset = u64::from(block) * u64::from(n);
                let chunk = basis
                    .and_then(|map| map.range(block_offset, len as usize))
                    .ok_or(WireError::Invalid {
                        what: "block reference",
                        value: i64::from(block),
                    })?;
                trace!("chunk[{block}] of size {len} at {block_offset} offset={offset}");
                sparse.write(out, chunk).map_err(write_failed)?;
                offset += u64::from(len);
            }
        }
    }

    if offset > 0 {
        sparse.finish(out).map_err(write_failed)?;
    }
    Ok(())
}
