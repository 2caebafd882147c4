#![forbid(unsafe_code)]

//! A disk-backed geographic R-tree: a paged, buffer-pooled spatial index
//! over WGS84 points, supporting insert, delete, update, k-nearest-neighbor,
//! and radius search.
//!
//! ```no_run
//! use geo_rtreed::{RtreeConfig, Engine, Point, SpatialData};
//!
//! let config = RtreeConfig::new("./db", 2, 4, 256);
//! let mut engine = Engine::open(&config)?;
//! engine.insert(SpatialData::new(Point::new(-6.2, 106.8), b"jakarta".to_vec()))?;
//! let nearest = engine.nearest_neighbors(1, Point::new(-6.2, 106.8))?;
//! engine.close()?;
//! # Ok::<(), geo_rtreed::RtreeError>(())
//! ```

pub mod buffer;
pub mod config;
pub mod disk;
pub mod geo;
pub mod page;
pub mod pq;
pub mod rtree;
pub mod utils;

pub use config::RtreeConfig;
pub use rtree::{Engine, Point, SpatialData};
pub use utils::errors::{Result, RtreeError};
