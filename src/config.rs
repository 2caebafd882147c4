//! Engine configuration: parameters supplied at open and the calibration
//! derived from them (block size, buffer pool capacity).
//!
//! Mirrors the teacher's `toml`-backed config pattern: a plain `serde`
//! struct that can be built programmatically or loaded from a file, with
//! all derived values computed once at open rather than mutated globally.

use crate::utils::errors::{Result, RtreeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Permitted on-disk page sizes, smallest first.
pub const PAGE_SIZE_CANDIDATES: [usize; 4] = [1024, 2048, 4096, 8192];

/// Buffer pool budget: `floor(100 MiB / block_size)` frames.
const BUFFER_POOL_BUDGET_BYTES: usize = 100 * 1024 * 1024;

/// Half-side, in degrees, used to expand a point into a degenerate rect.
pub const POINT_TOLERANCE_DEG: f64 = 1e-4;

/// User-supplied parameters for opening (or creating) an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtreeConfig {
    pub dir: PathBuf,
    #[serde(default = "default_dim")]
    pub dim: usize,
    pub min_entries: usize,
    pub max_entries: usize,
    pub max_payload_bytes: usize,
}

fn default_dim() -> usize {
    2
}

impl RtreeConfig {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(dir: P, min_entries: usize, max_entries: usize, max_payload_bytes: usize) -> Self {
        Self { dir: dir.into(), dim: 2, min_entries, max_entries, max_payload_bytes }
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or does not parse.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| RtreeError::Config(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.dim != 2 {
            return Err(RtreeError::Config("only dim = 2 (geographic points) is supported".into()));
        }
        if self.min_entries < 2 || self.min_entries > self.max_entries / 2 {
            return Err(RtreeError::Config(format!(
                "min_entries ({}) must satisfy 2 <= min_entries <= max_entries/2 ({})",
                self.min_entries,
                self.max_entries / 2
            )));
        }
        Ok(())
    }

    /// Computes the node-page size required to hold `max_entries` entries
    /// with payloads up to `max_payload_bytes`, rounded up to the smallest
    /// permitted page size.
    ///
    /// # Errors
    /// Returns [`RtreeError::PageTooLarge`] if no permitted size is large
    /// enough.
    pub fn calibrate(&self) -> Result<Calibration> {
        self.validate()?;
        // header(21) + max_entries * (left-growing 10 + right-growing tail)
        // tail = 6 f64 (48) + payload_len i32 (4) + length-prefixed bytes (4 + max_payload_bytes)
        let tail = 48 + 4 + 4 + self.max_payload_bytes;
        let required = 21 + self.max_entries * (10 + tail);
        let block_size = *PAGE_SIZE_CANDIDATES
            .iter()
            .find(|&&size| required <= size)
            .ok_or(RtreeError::PageTooLarge { computed: required, max: *PAGE_SIZE_CANDIDATES.last().unwrap() })?;
        let pool_capacity = (BUFFER_POOL_BUDGET_BYTES / block_size).max(1);
        Ok(Calibration { block_size, pool_capacity })
    }
}

/// Derived sizing computed once at open time; never mutated afterward.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    pub block_size: usize,
    pub pool_capacity: usize,
}
