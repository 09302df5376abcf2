//! Peer session wiring.
//!
//! A session runs over a full-duplex byte channel: one opaque stream each
//! direction. On the receiver peer the generator exclusively owns the
//! outbound half and the receiver the inbound half, so the two agents can
//! progress independently; the only coupling between them is the in-process
//! redo channel carrying phase-2 re-request indices (`None` is the `-1`
//! terminator). No lock is held across any channel operation.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use flist::FileList;

use crate::{generate_files, receive_files, send_files, EngineError, SyncConfig};

/// Receiving side of the receiver→generator redo stream.
pub type RedoReceiver = mpsc::Receiver<Option<u32>>;

/// Sending side of the receiver→generator redo stream.
pub type RedoSender = mpsc::Sender<Option<u32>>;

/// Runs the receiver peer: generator and receiver as two concurrent agents
/// sharing the channel back to the sender.
///
/// Running them sequentially would deadlock once the sender blocks writing
/// tokens while waiting for its next signature packet, so this is the one
/// scheduling shape the protocol supports.
pub fn run_receiver_peer<R, W>(
    cfg: &SyncConfig,
    list: &FileList,
    dest_root: &Path,
    local_name: Option<&Path>,
    channel_in: R,
    channel_out: W,
) -> Result<(), EngineError>
where
    R: Read + Send,
    W: Write + Send,
{
    let (redo_tx, redo_rx) = mpsc::channel();

    thread::scope(|scope| {
        let generator = scope.spawn(move || {
            generate_files(cfg, list, dest_root, local_name, channel_out, &redo_rx)
        });

        let received = receive_files(cfg, list, dest_root, local_name, channel_in, &redo_tx);
        // A receiver that bailed out early must not leave the generator
        // blocked on the redo stream.
        drop(redo_tx);

        let generated = generator.join().map_err(|_| EngineError::AgentPanic)?;
        received.and(generated)
    })
}

/// Runs the sender peer: a single agent pulling indices and signatures from
/// the inbound stream and pushing token streams outbound.
pub fn run_sender_peer<R: Read, W: Write>(
    cfg: &SyncConfig,
    list: &FileList,
    channel_in: R,
    channel_out: W,
) -> Result<u64, EngineError> {
    send_files(cfg, list, channel_in, channel_out)
}
