//! Buffer pool behavior: fetch/pin/unpin discipline, LRU-driven eviction
//! once the free list is exhausted, and capacity exhaustion errors.

use geo_rtreed::buffer::{BufferPoolManager, PAGE_FILE_NAME};
use geo_rtreed::disk::DiskManager;
use std::sync::Arc;

fn pool(dir: &std::path::Path, block_size: usize, pool_size: usize) -> BufferPoolManager {
    let disk = Arc::new(DiskManager::open(dir, block_size).unwrap());
    BufferPoolManager::new(disk, pool_size)
}

#[test]
fn fetching_the_same_block_twice_increments_pin_count() {
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(dir.path(), 32, 4);
    let (block_id, _) = pool.new_page(PAGE_FILE_NAME).unwrap();
    pool.unpin_page(&block_id, true);

    let f1 = pool.fetch_page(block_id.clone()).unwrap();
    let f2 = pool.fetch_page(block_id.clone()).unwrap();
    assert_eq!(f1, f2, "fetching a resident block returns the same frame");

    assert!(pool.unpin_page(&block_id, false));
    assert!(!pool.all_unpinned(), "still pinned once more after the double fetch");
    assert!(pool.unpin_page(&block_id, false));
    assert!(pool.all_unpinned());
}

#[test]
fn writes_survive_an_eviction_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(dir.path(), 32, 1);

    let (b0, f0) = pool.new_page(PAGE_FILE_NAME).unwrap();
    pool.with_frame_mut(f0, |buf| buf[0] = 7);
    pool.unpin_page(&b0, true);

    // Pool has one frame; allocating again must evict b0 (flushing it
    // first since it's dirty) to make room.
    let (b1, f1) = pool.new_page(PAGE_FILE_NAME).unwrap();
    pool.with_frame_mut(f1, |buf| buf[0] = 9);
    pool.unpin_page(&b1, true);

    let f0_again = pool.fetch_page(b0.clone()).unwrap();
    pool.with_frame(f0_again, |buf| assert_eq!(buf[0], 7, "dirty page must be flushed before eviction"));
    pool.unpin_page(&b0, false);
}

#[test]
fn new_page_fails_when_every_frame_is_pinned() {
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(dir.path(), 32, 2);
    let (_b0, _f0) = pool.new_page(PAGE_FILE_NAME).unwrap();
    let (_b1, _f1) = pool.new_page(PAGE_FILE_NAME).unwrap();
    // both frames are still pinned; nothing is evictable.
    assert!(pool.new_page(PAGE_FILE_NAME).is_err());
}

#[test]
fn unpin_page_on_an_already_evicted_block_is_a_harmless_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(dir.path(), 32, 1);
    let (b0, _) = pool.new_page(PAGE_FILE_NAME).unwrap();
    pool.unpin_page(&b0, false);
    assert!(pool.delete_page(&b0).unwrap());
    // b0 is gone from the pool now; unpinning it again must not panic.
    assert!(pool.unpin_page(&b0, false));
}

#[test]
fn flush_all_clears_dirty_state_without_touching_the_meta_block() {
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(dir.path(), 32, 4);
    // block 0 is conventionally the meta page; flush_all must skip it.
    let (meta, fmeta) = pool.new_page(PAGE_FILE_NAME).unwrap();
    assert_eq!(meta.block_num, 0);
    pool.with_frame_mut(fmeta, |buf| buf[0] = 1);
    pool.unpin_page(&meta, true);

    let (data, fdata) = pool.new_page(PAGE_FILE_NAME).unwrap();
    pool.with_frame_mut(fdata, |buf| buf[0] = 2);
    pool.unpin_page(&data, true);

    pool.flush_all().unwrap();

    let f_data_again = pool.fetch_page(data.clone()).unwrap();
    pool.with_frame(f_data_again, |buf| assert_eq!(buf[0], 2));
    pool.unpin_page(&data, false);
}
