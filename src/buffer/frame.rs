//! A single buffer pool slot: the in-memory contents of one on-disk block.
//!
//! Grounded on `examples/original_source/lib/buffer/buffer.go`'s `Buffer`
//! type, minus its log-manager/transaction fields — this engine has no
//! write-ahead log, so a frame only tracks what it needs to answer "is this
//! block's in-memory copy newer than disk, and who's using it right now."

use crate::disk::{BlockId, DiskManager};
use crate::utils::errors::Result;

pub struct Frame {
    pub block_id: Option<BlockId>,
    pub contents: Vec<u8>,
    pub pins: usize,
    pub is_dirty: bool,
}

impl Frame {
    #[must_use]
    pub fn new(block_size: usize) -> Self {
        Self { block_id: None, contents: vec![0u8; block_size], pins: 0, is_dirty: false }
    }

    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.pins > 0
    }

    pub fn pin(&mut self) {
        self.pins += 1;
    }

    pub fn unpin(&mut self) {
        self.pins = self.pins.saturating_sub(1);
    }

    /// Flushes this frame's contents to disk if it holds a block and is
    /// dirty; otherwise a no-op.
    ///
    /// # Errors
    /// Propagates the underlying write failure.
    pub fn flush(&mut self, disk: &DiskManager) -> Result<()> {
        if let Some(block_id) = &self.block_id {
            if self.is_dirty {
                disk.write(block_id, &self.contents)?;
                self.is_dirty = false;
            }
        }
        Ok(())
    }

    /// Flushes the frame's current contents (if dirty), then loads
    /// `block_id`'s contents from disk and resets pin/dirty state.
    ///
    /// # Errors
    /// Propagates the underlying flush or read failure.
    pub fn assign_to_block(&mut self, block_id: BlockId, disk: &DiskManager) -> Result<()> {
        self.flush(disk)?;
        disk.read(&block_id, &mut self.contents)?;
        self.block_id = Some(block_id);
        self.pins = 0;
        self.is_dirty = false;
        Ok(())
    }

    /// Resets the frame to an empty, unassigned state without touching
    /// disk — used when a frame is handed a brand-new block whose contents
    /// will be filled in by the caller rather than read back.
    pub fn reset_for_new_block(&mut self, block_id: BlockId, block_size: usize) {
        self.block_id = Some(block_id);
        self.contents = vec![0u8; block_size];
        self.pins = 0;
        self.is_dirty = false;
    }
}
