#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `engine` drives the delta-transfer protocol: three cooperating agents
//! converging a receiver's stale tree onto a sender's authoritative one with
//! minimum bytes on the wire.
//!
//! - The **generator** (receiver peer) walks the agreed file list, decides
//!   per entry whether anything needs transferring, and streams indices plus
//!   block-signature packets of the stale copies to the sender.
//! - The **sender** answers each signature packet with a reconstruction
//!   token stream produced by scanning its authoritative copy.
//! - The **receiver** (receiver peer, concurrent with the generator)
//!   rebuilds each file into a temp path from literals and block
//!   references, atomically swaps it into place and applies metadata.
//!
//! The generator and receiver MUST run concurrently: the sender blocks on
//! back-channel writes once its outbound buffer fills, so running them
//! sequentially deadlocks. [`run_receiver_peer`] wires the two up as scoped
//! threads with exclusive ownership of one channel direction each.
//!
//! Protocol versions 13 and newer add a second pass in which the truncated
//! strong checksum is widened to its full length; the drivers mirror each
//! other's `-1` phase terminators to move through it in lock step.

mod cleanup;
mod config;
mod delete;
mod error;
mod generator;
mod receiver;
mod sender;
mod session;

pub use cleanup::{interrupted, request_interrupt, reset_interrupt};
pub use config::SyncConfig;
pub use error::{EngineError, ExitCode};
pub use generator::generate_files;
pub use receiver::receive_files;
pub use sender::send_files;
pub use session::{run_receiver_peer, run_sender_peer, RedoReceiver, RedoSender};
