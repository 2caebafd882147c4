use thiserror::Error;

/// Error taxonomy for the storage and index layers.
///
/// All engine operations are fallible; nothing in this crate panics on a
/// bad read, a full buffer pool, or a malformed page.
#[derive(Debug, Error)]
pub enum RtreeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("page size {computed} exceeds the largest permitted size {max}")]
    PageTooLarge { computed: usize, max: usize },

    #[error("all frames in the buffer pool are pinned")]
    AllFramesPinned,

    #[error("object not found")]
    NotFound,

    #[error("corrupt page: {0}")]
    Corrupt(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RtreeError>;
