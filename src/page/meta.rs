//! The metadata page (block 0): root pointer, tree height, entry count,
//! and the freelist page pointer.
//!
//! Grounded on `examples/original_source/lib/disk/page.go`'s
//! `SerializeMetadata`/`DeserializeMetadata` and
//! `examples/original_source/lib/meta/meta.go`'s `Meta` struct.
//!
//! `next_block_id` is tracked in memory only and recomputed at open time
//! from [`crate::disk::DiskManager::block_length`]; the original persists
//! it on the in-memory struct at `Close()` but never serializes it into
//! the meta page, so on reopen it would silently reset to zero. Deriving
//! it from the page file's length instead of carrying a dead field keeps
//! the on-disk format honest about what it actually stores.

use crate::disk::BlockNum;
use crate::page::codec::{get_u16, get_u64, put_u16, put_u64};

pub const META_BLOCK_NUM: BlockNum = 0;

/// Engine-wide bookkeeping persisted in block 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub root: BlockNum,
    pub freelist_page: BlockNum,
    pub height: u16,
    pub size: u32,
}

impl Meta {
    #[must_use]
    pub fn empty() -> Self {
        Self { root: 0, freelist_page: 0, height: 0, size: 0 }
    }

    pub fn serialize(&self, buf: &mut [u8]) {
        put_u64(buf, 0, self.root);
        put_u64(buf, 8, self.freelist_page);
        put_u16(buf, 16, self.height);
        put_u32_at(buf, 18, self.size);
    }

    #[must_use]
    pub fn deserialize(buf: &[u8]) -> Self {
        let root = get_u64(buf, 0);
        let freelist_page = get_u64(buf, 8);
        let height = get_u16(buf, 16);
        let size = get_u32_at(buf, 18);
        Self { root, freelist_page, height, size }
    }
}

fn put_u32_at(buf: &mut [u8], offset: usize, val: u32) {
    buf[offset..offset + 4].copy_from_slice(&val.to_le_bytes());
}

fn get_u32_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}
