//! Tests for the block accessor and the sequential packer

use std::fs;
use std::path::PathBuf;

use blockstore::storage::{BlockFile, BlockPacker, PackMode};
use blockstore::StoreError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("blocks.dat");
    (temp_dir, path)
}

// =============================================================================
// BlockFile Tests
// =============================================================================

#[test]
fn test_write_and_read_block() {
    let (_temp, path) = setup_temp_file();

    let mut file = BlockFile::create(&path, 16).unwrap();
    file.write_block(0, b"hello").unwrap();
    file.write_block(1, b"world!").unwrap();

    assert_eq!(file.block_count().unwrap(), 2);
    let block = file.read_block(1).unwrap();
    assert_eq!(&block[..6], b"world!");
    assert!(block[6..].iter().all(|&b| b == 0));
}

#[test]
fn test_blocks_are_padded_to_block_size() {
    let (_temp, path) = setup_temp_file();

    let mut file = BlockFile::create(&path, 32).unwrap();
    file.write_block(0, b"abc").unwrap();
    drop(file);

    assert_eq!(fs::metadata(&path).unwrap().len(), 32);
}

#[test]
fn test_write_block_larger_than_block_fails() {
    let (_temp, path) = setup_temp_file();

    let mut file = BlockFile::create(&path, 4).unwrap();
    assert!(matches!(
        file.write_block(0, b"too long"),
        Err(StoreError::Format(_))
    ));
}

#[test]
fn test_patch_overwrites_inside_block() {
    let (_temp, path) = setup_temp_file();

    let mut file = BlockFile::create(&path, 8).unwrap();
    file.write_block(0, b"aaaaaaaa").unwrap();
    file.write_block(1, b"bbbbbbbb").unwrap();
    file.patch(1, 2, b"XY").unwrap();

    assert_eq!(file.read_block(0).unwrap(), b"aaaaaaaa");
    assert_eq!(file.read_block(1).unwrap(), b"bbXYbbbb");
}

#[test]
fn test_patch_cannot_cross_block_boundary() {
    let (_temp, path) = setup_temp_file();

    let mut file = BlockFile::create(&path, 8).unwrap();
    file.write_block(0, b"").unwrap();
    assert!(file.patch(0, 6, b"XYZ").is_err());
}

#[test]
fn test_blocks_iterates_in_order() {
    let (_temp, path) = setup_temp_file();

    let mut file = BlockFile::create(&path, 4).unwrap();
    for i in 0..3u8 {
        file.write_block(i as usize, &[i; 4]).unwrap();
    }

    let blocks: Vec<(usize, Vec<u8>)> = file.blocks().unwrap().map(|b| b.unwrap()).collect();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[2], (2, vec![2u8; 4]));
}

#[test]
fn test_trailing_partial_block_is_ignored() {
    let (_temp, path) = setup_temp_file();
    fs::write(&path, [1u8; 10]).unwrap();

    let file = BlockFile::open(&path, 4).unwrap();
    assert_eq!(file.block_count().unwrap(), 2);
}

#[test]
fn test_open_missing_file_is_io_error() {
    let (_temp, path) = setup_temp_file();
    assert!(matches!(BlockFile::open(&path, 8), Err(StoreError::Io(_))));
}

#[test]
fn test_open_if_exists() {
    let (_temp, path) = setup_temp_file();
    assert!(BlockFile::open_if_exists(&path, 8).unwrap().is_none());

    BlockFile::create(&path, 8).unwrap();
    let file = BlockFile::open_if_exists(&path, 8).unwrap().unwrap();
    assert_eq!(file.path(), path.as_path());
    assert_eq!(file.block_size(), 8);
}

#[test]
fn test_open_or_create_keeps_contents() {
    let (_temp, path) = setup_temp_file();

    let mut file = BlockFile::create(&path, 4).unwrap();
    file.write_block(0, b"keep").unwrap();
    drop(file);

    let mut file = BlockFile::open_or_create(&path, 4).unwrap();
    assert_eq!(file.read_block(0).unwrap(), b"keep");
}

// =============================================================================
// BlockPacker Tests
// =============================================================================

#[test]
fn test_contiguous_packer_starts_new_block_when_full() {
    let mut packer = BlockPacker::new(10, PackMode::Contiguous);
    packer.push(&[1; 6]);
    packer.push(&[2; 4]);
    packer.push(&[3; 5]);

    let blocks = packer.finish();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].bytes.len(), 10);
    assert_eq!(blocks[0].record_count, 2);
    assert_eq!(blocks[1].index, 1);
    assert_eq!(blocks[1].bytes, vec![3; 5]);
    assert!(!blocks[0].spills);
}

#[test]
fn test_contiguous_packer_never_reopens_a_closed_block() {
    let mut packer = BlockPacker::new(10, PackMode::Contiguous);
    packer.push(&[1; 6]);
    packer.push(&[2; 6]);
    // Would fit in block 0, but next-fit only looks at the current block
    packer.push(&[3; 4]);

    let blocks = packer.finish();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].bytes.len(), 6);
    assert_eq!(blocks[1].bytes.len(), 10);
}

#[test]
fn test_spanning_packer_splits_frames() {
    let mut packer = BlockPacker::new(10, PackMode::Spanning);
    packer.push(&[1; 5]);
    packer.push(&[2; 12]);

    let blocks = packer.finish();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].bytes, [vec![1; 5], vec![2; 5]].concat());
    assert!(blocks[0].spills);
    assert_eq!(blocks[0].record_count, 2);
    assert_eq!(blocks[1].bytes, vec![2; 7]);
    assert_eq!(blocks[1].record_count, 0);
}

#[test]
fn test_spanning_packer_pads_short_tails() {
    let mut packer = BlockPacker::new(10, PackMode::Spanning);
    packer.push(&[1; 7]);
    // Only 3 bytes left: less than a frame head, so the next frame starts fresh
    packer.push(&[2; 5]);

    let blocks = packer.finish();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].bytes.len(), 7);
    assert!(!blocks[0].spills);
    assert_eq!(blocks[1].bytes, vec![2; 5]);
}

#[test]
fn test_packer_resume_keeps_prefix() {
    let mut packer = BlockPacker::resume(10, PackMode::Spanning, 3, vec![9; 4]);
    packer.push(&[1; 8]);

    let blocks = packer.finish();
    assert_eq!(blocks[0].index, 3);
    assert_eq!(blocks[0].bytes, [vec![9; 4], vec![1; 6]].concat());
    assert_eq!(blocks[1].index, 4);
    assert_eq!(blocks[1].bytes, vec![1; 2]);
}

#[test]
fn test_empty_packer_produces_no_blocks() {
    let packer = BlockPacker::new(10, PackMode::Contiguous);
    assert!(packer.finish().is_empty());
}
