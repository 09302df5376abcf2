//! The sender: single agent on the authoritative peer answering signature
//! packets with reconstruction token streams.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

use flist::FileList;
use matching::{generate_delta, DeltaStats};
use protocol::wire::{read_index, write_index, write_int};
use protocol::WireError;
use signature::FileSignature;
use tracing::{debug, info, trace, warn};
use transfer::FileMap;

use crate::{EngineError, SyncConfig};

/// Runs the sender until both phases are terminated.
///
/// File indices are processed strictly in arrival order. A `-1` either
/// advances to the full-checksum phase (mirrored back to the receiver) or
/// ends the session, after which a final `-1` is written so the receiver's
/// token loop terminates too. Returns the total number of authoritative
/// bytes examined.
pub fn send_files<R: Read, W: Write>(
    cfg: &SyncConfig,
    list: &FileList,
    f_in: R,
    f_out: W,
) -> Result<u64, EngineError> {
    let mut input = BufReader::new(f_in);
    let mut out = BufWriter::new(f_out);
    let mut csum_len = cfg.checksum_length();
    let mut phase = 0;
    let mut total = 0u64;
    let mut totals = DeltaStats::default();

    debug!("send_files starting");

    loop {
        let index = match read_index(&mut input)? {
            Some(index) => index,
            None => {
                if phase == 0 && cfg.remote_version.supports_redo() {
                    phase = 1;
                    csum_len.widen();
                    write_index(&mut out, None)?;
                    out.flush().map_err(WireError::Io)?;
                    debug!("send_files entering full-checksum phase");
                    continue;
                }
                break;
            }
        };

        let entry = list.get(index as usize).ok_or(WireError::Invalid {
            what: "file index",
            value: i64::from(index),
        })?;
        let fname = entry.source_path();
        trace!("send_files({index},{})", fname.display());

        if cfg.dry_run {
            write_index(&mut out, Some(index))?;
            continue;
        }

        let signature = FileSignature::read_from(&mut input, csum_len)?;

        let file = match File::open(&fname) {
            Ok(file) => file,
            Err(err) => {
                warn!("send_files failed to open {}: {err}", fname.display());
                continue;
            }
        };
        let map = FileMap::new(&file).map_err(|source| EngineError::File {
            context: "fstat failed on",
            path: fname.clone(),
            source,
        })?;
        trace!("send_files mapped {} of size {}", fname.display(), map.len());

        write_index(&mut out, Some(index))?;
        write_int(&mut out, signature.count() as i32)?;
        write_int(&mut out, signature.block_len() as i32)?;
        write_int(&mut out, signature.remainder() as i32)?;

        info!("{}", entry.name.display());
        let stats = generate_delta(map.bytes(), &signature, cfg.checksum_algorithm, &mut out)?;
        out.flush().map_err(WireError::Io)?;

        totals.literal_bytes += stats.literal_bytes;
        totals.matched_bytes += stats.matched_bytes;
        totals.matches += stats.matches;
        total += map.len();
        trace!("sender finished {}", fname.display());
    }

    debug!(
        literal = totals.literal_bytes,
        matched = totals.matched_bytes,
        matches = totals.matches,
        "send_files finished"
    );

    write_index(&mut out, None)?;
    out.flush().map_err(WireError::Io)?;
    Ok(total)
}
