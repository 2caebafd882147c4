//! The buffer pool: caches fixed-size disk blocks in memory under an LRU
//! eviction policy with an explicit pin/unpin discipline.

pub mod frame;
pub mod lru;
pub mod pool;

pub use frame::Frame;
pub use lru::LruReplacer;
pub use pool::{BufferPoolManager, PAGE_FILE_NAME};
