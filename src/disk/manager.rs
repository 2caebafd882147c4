//! Fixed-size block I/O over a directory of files.
//!
//! Grounded on `examples/original_source/lib/disk/disk_manager.go`: one
//! open `File` handle per logical file name, memoized behind a mutex so
//! incidental parallel opens don't race (the engine itself is
//! single-writer, per spec; this mutex exists purely for defensive
//! safety, the way the teacher guards shared maps with `parking_lot` in
//! `cache/core.rs`).

use crate::disk::block::{BlockId, BlockNum};
use crate::utils::errors::{Result, RtreeError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub struct DiskManager {
    db_dir: PathBuf,
    block_size: usize,
    open_files: Mutex<HashMap<String, File>>,
}

impl DiskManager {
    /// Opens (creating if absent) the database directory `db_dir`, backing
    /// all blocks with `block_size`-byte strides.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open(db_dir: &Path, block_size: usize) -> Result<Self> {
        if !db_dir.exists() {
            fs::create_dir_all(db_dir)?;
        }
        Ok(Self { db_dir: db_dir.to_path_buf(), block_size, open_files: Mutex::new(HashMap::new()) })
    }

    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.db_dir
    }

    /// Reads exactly `block_size` bytes for `block_id` into `buf`.
    ///
    /// # Errors
    /// Returns an error if the block is past the end of the file or the
    /// underlying I/O fails.
    pub fn read(&self, block_id: &BlockId, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.block_size);
        let path = self.path_for(&block_id.file_name);
        let mut files = self.open_files.lock();
        let file = self.get_file(&mut files, &path)?;

        let file_len = file.metadata()?.len();
        let offset = block_id.block_num * self.block_size as u64;
        if offset + self.block_size as u64 > file_len {
            return Err(RtreeError::Corrupt(format!(
                "read block {} out of range (file len {file_len})",
                block_id.block_num
            )));
        }
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        log::trace!(target: "geo_rtreed::disk", "read block {} ({} bytes)", block_id.block_num, buf.len());
        Ok(())
    }

    /// Writes exactly `block_size` bytes at `block_id`'s offset.
    ///
    /// # Errors
    /// Returns an error if the underlying I/O fails.
    pub fn write(&self, block_id: &BlockId, buf: &[u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.block_size);
        let path = self.path_for(&block_id.file_name);
        let mut files = self.open_files.lock();
        let file = self.get_file(&mut files, &path)?;

        let offset = block_id.block_num * self.block_size as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        file.sync_data()?;
        log::trace!(target: "geo_rtreed::disk", "wrote block {} ({} bytes)", block_id.block_num, buf.len());
        Ok(())
    }

    /// Appends one zero-filled block to `file_name` and returns its id.
    ///
    /// # Errors
    /// Returns an error if the underlying I/O fails.
    pub fn append(&self, file_name: &str) -> Result<BlockId> {
        let new_num = self.block_length(file_name)?;
        let block_id = BlockId::new(file_name, new_num);
        let zeros = vec![0u8; self.block_size];
        self.write(&block_id, &zeros)?;
        log::debug!(target: "geo_rtreed::disk", "appended block {new_num} to {file_name}");
        Ok(block_id)
    }

    /// Returns the number of blocks currently in `file_name`.
    ///
    /// # Errors
    /// Returns an error if the underlying I/O fails.
    pub fn block_length(&self, file_name: &str) -> Result<BlockNum> {
        let path = self.path_for(file_name);
        let mut files = self.open_files.lock();
        let file = self.get_file(&mut files, &path)?;
        Ok(file.metadata()?.len() / self.block_size as u64)
    }

    fn path_for(&self, file_name: &str) -> PathBuf {
        self.db_dir.join(file_name)
    }

    fn get_file<'a>(&self, files: &'a mut HashMap<String, File>, path: &Path) -> Result<&'a mut File> {
        let key = path.to_string_lossy().into_owned();
        if !files.contains_key(&key) {
            let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
            files.insert(key.clone(), file);
        }
        Ok(files.get_mut(&key).expect("just inserted"))
    }
}
