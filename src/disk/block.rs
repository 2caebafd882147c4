/// A 64-bit page identifier. Reserved: `0` is the metadata page.
pub type BlockNum = u64;

/// Names a single fixed-size block inside a database file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockId {
    pub file_name: String,
    pub block_num: BlockNum,
}

impl BlockId {
    #[must_use]
    pub fn new(file_name: impl Into<String>, block_num: BlockNum) -> Self {
        Self { file_name: file_name.into(), block_num }
    }
}
