//! Deletion reconciliation and backup behavior.

mod util;

use std::fs;

use engine::SyncConfig;
use util::{small_block_config, sync_trees, write_file};

#[test]
fn extraneous_file_is_deleted() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_file(&src.path().join("kept.txt"), b"kept");
    write_file(&dest.path().join("kept.txt"), b"kept");
    write_file(&dest.path().join("extra.txt"), b"extraneous");

    let cfg = SyncConfig {
        delete_mode: true,
        ..small_block_config()
    };
    sync_trees(&cfg, src.path(), dest.path());

    assert!(!dest.path().join("extra.txt").exists());
    assert_eq!(fs::read(dest.path().join("kept.txt")).unwrap(), b"kept");
}

#[test]
fn extraneous_directory_tree_is_deleted_children_first() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_file(&src.path().join("kept.txt"), b"kept");
    write_file(&dest.path().join("kept.txt"), b"kept");
    write_file(&dest.path().join("junk/deep/file.bin"), b"junk");

    let cfg = SyncConfig {
        delete_mode: true,
        ..small_block_config()
    };
    sync_trees(&cfg, src.path(), dest.path());

    assert!(!dest.path().join("junk").exists());
}

#[test]
fn without_delete_mode_extraneous_files_survive() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_file(&src.path().join("kept.txt"), b"kept");
    write_file(&dest.path().join("extra.txt"), b"extraneous");

    sync_trees(&small_block_config(), src.path(), dest.path());

    assert_eq!(fs::read(dest.path().join("extra.txt")).unwrap(), b"extraneous");
}

#[test]
fn dry_run_delete_keeps_everything() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_file(&src.path().join("kept.txt"), b"kept");
    write_file(&dest.path().join("extra.txt"), b"extraneous");

    let cfg = SyncConfig {
        delete_mode: true,
        dry_run: true,
        ..small_block_config()
    };
    sync_trees(&cfg, src.path(), dest.path());

    assert!(dest.path().join("extra.txt").exists());
}

#[test]
fn replaced_target_is_recoverable_from_its_backup() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_file(&src.path().join("f"), b"new content");
    write_file(&dest.path().join("f"), b"old content prior");

    let cfg = SyncConfig {
        make_backups: true,
        ..small_block_config()
    };
    sync_trees(&cfg, src.path(), dest.path());

    assert_eq!(fs::read(dest.path().join("f")).unwrap(), b"new content");
    assert_eq!(fs::read(dest.path().join("f~")).unwrap(), b"old content prior");
}

#[test]
fn custom_backup_suffix_is_honored() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_file(&src.path().join("f"), b"new");
    write_file(&dest.path().join("f"), b"disposable old");

    let cfg = SyncConfig {
        make_backups: true,
        backup_suffix: ".bak".to_owned(),
        ..small_block_config()
    };
    sync_trees(&cfg, src.path(), dest.path());

    assert_eq!(fs::read(dest.path().join("f.bak")).unwrap(), b"disposable old");
}

#[test]
fn backups_of_missing_targets_produce_nothing() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_file(&src.path().join("fresh"), b"brand new");

    let cfg = SyncConfig {
        make_backups: true,
        ..small_block_config()
    };
    sync_trees(&cfg, src.path(), dest.path());

    assert_eq!(fs::read(dest.path().join("fresh")).unwrap(), b"brand new");
    assert!(!dest.path().join("fresh~").exists());
}
