//! The buffer pool manager: fetch/pin/unpin/evict over a fixed set of
//! frames, backed by the disk manager and an LRU replacer.
//!
//! Grounded on `examples/original_source/lib/buffer/buffer_pool_manager.go`.
//! Frame contents are exposed to callers via `with_frame`/`with_frame_mut`
//! rather than returned as a borrow straight out of the pool, since the
//! frame table lives behind a single `parking_lot::Mutex` (defensive, the
//! way the teacher guards its shared collection state in `cache/core.rs`;
//! the engine above this layer is single-writer).

use crate::buffer::frame::Frame;
use crate::buffer::lru::LruReplacer;
use crate::disk::{BlockId, BlockNum, DiskManager};
use crate::utils::errors::{Result, RtreeError};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// The single file all node/meta pages live in.
pub const PAGE_FILE_NAME: &str = "rtree.pages";

struct PoolState {
    frames: Vec<Frame>,
    buffer_table: HashMap<BlockId, usize>,
    free_list: VecDeque<usize>,
}

pub struct BufferPoolManager {
    disk: Arc<DiskManager>,
    replacer: LruReplacer,
    state: Mutex<PoolState>,
}

impl BufferPoolManager {
    #[must_use]
    pub fn new(disk: Arc<DiskManager>, pool_size: usize) -> Self {
        let block_size = disk.block_size();
        let frames = (0..pool_size).map(|_| Frame::new(block_size)).collect();
        let free_list = (0..pool_size).collect();
        Self {
            disk,
            replacer: LruReplacer::new(pool_size),
            state: Mutex::new(PoolState { frames, buffer_table: HashMap::new(), free_list }),
        }
    }

    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.state.lock().frames.len()
    }

    /// Finds a free frame id, evicting the least recently used unpinned
    /// frame if the free list is exhausted. Flushes the evicted frame if
    /// it's dirty.
    fn claim_frame(&self, state: &mut PoolState) -> Result<usize> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }
        let frame_id = self.replacer.victim().ok_or(RtreeError::AllFramesPinned)?;
        if let Some(old_block) = state.frames[frame_id].block_id.clone() {
            state.frames[frame_id].flush(&self.disk)?;
            state.buffer_table.remove(&old_block);
        }
        Ok(frame_id)
    }

    /// Fetches `block_id` into the pool, pinning it, and returns its frame
    /// id. Reads from disk on a cache miss.
    ///
    /// # Errors
    /// Returns [`RtreeError::AllFramesPinned`] if no frame is free or
    /// evictable, or propagates a disk read failure.
    pub fn fetch_page(&self, block_id: BlockId) -> Result<usize> {
        let mut state = self.state.lock();
        if let Some(&frame_id) = state.buffer_table.get(&block_id) {
            state.frames[frame_id].pin();
            self.replacer.pin(frame_id);
            return Ok(frame_id);
        }

        let frame_id = self.claim_frame(&mut state)?;
        state.frames[frame_id].assign_to_block(block_id.clone(), &self.disk)?;
        state.frames[frame_id].pin();
        state.buffer_table.insert(block_id, frame_id);
        self.replacer.pin(frame_id);
        log::trace!(target: "geo_rtreed::buffer", "fetched frame {frame_id}");
        Ok(frame_id)
    }

    /// Allocates a fresh block in `file_name`, pins it in the pool, and
    /// returns its id plus frame id. The frame's contents start zeroed;
    /// callers must serialize into it and unpin with `is_dirty = true`.
    ///
    /// # Errors
    /// Returns [`RtreeError::AllFramesPinned`] if no frame is free or
    /// evictable, or propagates a disk append failure.
    pub fn new_page(&self, file_name: &str) -> Result<(BlockId, usize)> {
        let block_size = self.disk.block_size();
        let mut state = self.state.lock();
        let frame_id = self.claim_frame(&mut state)?;
        let block_id = self.disk.append(file_name)?;
        state.frames[frame_id].reset_for_new_block(block_id.clone(), block_size);
        state.frames[frame_id].pin();
        state.buffer_table.insert(block_id.clone(), frame_id);
        self.replacer.pin(frame_id);
        log::debug!(target: "geo_rtreed::buffer", "new page {} in frame {frame_id}", block_id.block_num);
        Ok((block_id, frame_id))
    }

    /// Decrements the pin count for `block_id`, marking it dirty if
    /// requested. Once unpinned it becomes eligible for eviction.
    ///
    /// Returns `true` if the block was found (whether or not it needed
    /// unpinning), matching the teacher's tolerant "already gone" handling.
    pub fn unpin_page(&self, block_id: &BlockId, is_dirty: bool) -> bool {
        let mut state = self.state.lock();
        let Some(&frame_id) = state.buffer_table.get(block_id) else {
            return true;
        };
        if is_dirty {
            state.frames[frame_id].is_dirty = true;
        }
        if !state.frames[frame_id].is_pinned() {
            return false;
        }
        state.frames[frame_id].unpin();
        if !state.frames[frame_id].is_pinned() {
            self.replacer.unpin(frame_id);
        }
        true
    }

    /// Removes `block_id` from the pool, flushing it first if dirty.
    /// Returns `false` if the page is still pinned.
    ///
    /// # Errors
    /// Propagates a disk write failure from the flush.
    pub fn delete_page(&self, block_id: &BlockId) -> Result<bool> {
        let mut state = self.state.lock();
        let Some(&frame_id) = state.buffer_table.get(block_id) else {
            return Ok(true);
        };
        if state.frames[frame_id].is_pinned() {
            return Ok(false);
        }
        state.frames[frame_id].flush(&self.disk)?;
        state.buffer_table.remove(block_id);
        self.replacer.remove(frame_id);
        state.frames[frame_id] = Frame::new(self.disk.block_size());
        state.free_list.push_back(frame_id);
        Ok(true)
    }

    /// Flushes every resident frame to disk, skipping the metadata page
    /// (block 0), which the engine writes explicitly on close.
    ///
    /// # Errors
    /// Propagates the first disk write failure encountered.
    pub fn flush_all(&self) -> Result<()> {
        let mut state = self.state.lock();
        for frame_id in 0..state.frames.len() {
            let is_meta = matches!(&state.frames[frame_id].block_id, Some(b) if b.block_num == 0);
            if is_meta {
                continue;
            }
            state.frames[frame_id].flush(&self.disk)?;
        }
        Ok(())
    }

    /// Reads the current contents of `frame_id` without copying.
    pub fn with_frame<R>(&self, frame_id: usize, f: impl FnOnce(&[u8]) -> R) -> R {
        let state = self.state.lock();
        f(&state.frames[frame_id].contents)
    }

    /// Mutates the current contents of `frame_id`. Does not itself mark
    /// the frame dirty; pair with `unpin_page(.., true)`.
    pub fn with_frame_mut<R>(&self, frame_id: usize, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut state = self.state.lock();
        f(&mut state.frames[frame_id].contents)
    }

    /// The number of blocks currently allocated in the page file, i.e. the
    /// next block number that would be assigned by `new_page`.
    ///
    /// # Errors
    /// Propagates a disk I/O failure.
    pub fn next_block_id(&self) -> Result<BlockNum> {
        self.disk.block_length(PAGE_FILE_NAME)
    }

    /// Returns whether every frame in the pool currently has a pin count of
    /// zero. Checked by tests after each top-level engine operation to
    /// verify the pin-balance invariant: a leaked pin here means some
    /// fetch/new page was never matched by an `unpin_page`.
    #[must_use]
    pub fn all_unpinned(&self) -> bool {
        self.state.lock().frames.iter().all(|f| !f.is_pinned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(dir: &std::path::Path, block_size: usize, pool_size: usize) -> BufferPoolManager {
        let disk = Arc::new(DiskManager::open(dir, block_size).unwrap());
        BufferPoolManager::new(disk, pool_size)
    }

    #[test]
    fn new_page_then_fetch_returns_same_contents() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool(dir.path(), 64, 4);
        let (block_id, frame_id) = pool.new_page(PAGE_FILE_NAME).unwrap();
        pool.with_frame_mut(frame_id, |buf| buf[0] = 9);
        pool.unpin_page(&block_id, true);

        let frame_id2 = pool.fetch_page(block_id.clone()).unwrap();
        pool.with_frame(frame_id2, |buf| assert_eq!(buf[0], 9));
        pool.unpin_page(&block_id, false);
    }

    #[test]
    fn evicts_unpinned_frames_when_pool_is_full() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool(dir.path(), 32, 2);
        let (b0, _) = pool.new_page(PAGE_FILE_NAME).unwrap();
        pool.unpin_page(&b0, false);
        let (b1, _) = pool.new_page(PAGE_FILE_NAME).unwrap();
        pool.unpin_page(&b1, false);
        // Pool has only 2 frames; both now unpinned. A third allocation
        // must evict one rather than failing.
        let (b2, _) = pool.new_page(PAGE_FILE_NAME).unwrap();
        pool.unpin_page(&b2, false);
    }

    #[test]
    fn fetch_fails_when_all_frames_pinned() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool(dir.path(), 32, 1);
        let (b0, _) = pool.new_page(PAGE_FILE_NAME).unwrap();
        let _ = b0;
        // one frame, still pinned -> next allocation has nothing to evict
        assert!(pool.new_page(PAGE_FILE_NAME).is_err());
    }
}
