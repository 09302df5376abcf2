//! Shared scaffolding for the end-to-end protocol tests: a socketpair-backed
//! full-duplex channel with the sender peer on its own thread and the
//! receiver peer (generator + receiver agents) on the calling thread.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::fs;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread;

use engine::{run_receiver_peer, run_sender_peer, SyncConfig};
use flist::FileList;

/// Builds the authoritative list for a source tree, enriching regular
/// entries with whole-file digests when the config asks for them.
pub fn build_list(cfg: &SyncConfig, src_root: &Path) -> FileList {
    let mut entries = FileList::from_local_tree(src_root, true).into_files();
    if cfg.always_checksum {
        for entry in &mut entries {
            if entry.mode.is_regular() {
                let mut file = fs::File::open(entry.source_path()).expect("open source");
                entry.checksum = Some(
                    cfg.checksum_algorithm
                        .digest_reader(&mut file)
                        .expect("digest source"),
                );
            }
        }
    }
    FileList::new(entries)
}

/// Runs one full protocol round between `src_root` and `dest_root`.
/// Returns the total authoritative bytes the sender examined.
pub fn sync_trees(cfg: &SyncConfig, src_root: &Path, dest_root: &Path) -> u64 {
    let list = build_list(cfg, src_root);
    sync_list(cfg, &list, dest_root)
}

/// Runs one full protocol round for an already-built list.
pub fn sync_list(cfg: &SyncConfig, list: &FileList, dest_root: &Path) -> u64 {
    logging::init(logging::Verbosity::QUIET);

    let (sender_stream, receiver_stream) = UnixStream::pair().expect("socketpair");

    thread::scope(|scope| {
        let sender = scope.spawn(move || {
            let input = sender_stream.try_clone().expect("clone sender stream");
            run_sender_peer(cfg, list, input, sender_stream)
        });

        let receiver_in = receiver_stream.try_clone().expect("clone receiver stream");
        run_receiver_peer(cfg, list, dest_root, None, receiver_in, receiver_stream)
            .expect("receiver peer");

        sender.join().expect("sender thread").expect("sender peer")
    })
}

/// Asserts that `dest_root` mirrors `src_root` for every regular file.
pub fn assert_trees_match(src_root: &Path, dest_root: &Path) {
    let list = FileList::from_local_tree(src_root, true);
    for entry in list.files() {
        let dest = dest_root.join(&entry.name);
        if entry.mode.is_dir() {
            assert!(dest.is_dir(), "missing directory {}", dest.display());
        } else if entry.mode.is_regular() {
            let expected = fs::read(entry.source_path()).expect("read source");
            let actual = fs::read(&dest)
                .unwrap_or_else(|err| panic!("read {}: {err}", dest.display()));
            assert_eq!(expected, actual, "content mismatch for {}", dest.display());
        }
    }
}

/// Convenience for writing one file, creating parents as needed.
pub fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parents");
    }
    fs::write(path, content).expect("write file");
}

/// Pushes a file's mtime an hour into the past, so a stale copy of the same
/// size does not accidentally pass the mtime identity short-circuit.
pub fn age(path: &Path) {
    let meta = fs::metadata(path).expect("stat for aging");
    let mtime = filetime::FileTime::from_last_modification_time(&meta);
    let aged = filetime::FileTime::from_unix_time(mtime.unix_seconds() - 3600, 0);
    filetime::set_file_mtime(path, aged).expect("age mtime");
}

/// A config tuned for the compact wire scenarios: 4-byte blocks, 2-byte
/// truncated checksums.
pub fn small_block_config() -> SyncConfig {
    SyncConfig {
        block_size: std::num::NonZeroU32::new(4).expect("non-zero"),
        csum_length: 2,
        recurse: true,
        ..SyncConfig::default()
    }
}
