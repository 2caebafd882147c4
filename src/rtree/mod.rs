//! The R-tree itself: geometry/node types ([`types`]) and the disk-backed
//! engine that maintains them ([`engine`]).

pub mod engine;
pub mod types;

pub use engine::Engine;
pub use types::{Entry, Node, PageRef, Point, Rect, SpatialData};
