//! Page-level encoding: primitive accessors, node layout, and the meta page.

pub mod codec;
pub mod meta;
pub mod node;

pub use meta::{Meta, META_BLOCK_NUM};
pub use node::{deserialize_node, serialize_node};
