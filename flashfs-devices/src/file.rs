//! Flash image stored in a host file.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use flashfs::{EngineConfig, Error, Geometry};

use crate::ram::ERASED;

/// A flash image backed by a file on the host.
///
/// Useful for preparing images on a workstation and flashing them later.
/// Programming writes bytes as given; erasing fills a block with [`ERASED`].
#[derive(Debug)]
pub struct FileFlash {
    file: RefCell<File>,
    block_size: u32,
    block_count: u32,
}

impl FileFlash {
    /// Create (or replace) an erased image at `path` sized for `geometry`.
    pub fn create(path: impl AsRef<Path>, geometry: Geometry) -> io::Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let block = vec![ERASED; geometry.block_size as usize];
        for _ in 0..geometry.block_count {
            file.write_all(&block)?;
        }
        file.flush()?;

        Ok(Self {
            file: RefCell::new(file),
            block_size: geometry.block_size,
            block_count: geometry.block_count,
        })
    }

    /// Open an existing image, deriving the block count from its length.
    pub fn open(path: impl AsRef<Path>, block_size: u32) -> io::Result<Self> {
        if block_size == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "block size cannot be zero"));
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: RefCell::new(file),
            block_size,
            block_count: (len / block_size as u64) as u32,
        })
    }

    /// Build an engine configuration wired to this image.
    pub fn into_config(self, geometry: Geometry) -> EngineConfig<Self> {
        EngineConfig::new(self, Self::read, Self::prog, Self::erase, Self::sync, geometry)
    }

    /// Number of whole blocks in the image.
    #[inline]
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    fn offset(&self, block: u32, off: u32, len: usize) -> Option<u64> {
        if block >= self.block_count || off as usize + len > self.block_size as usize {
            return None;
        }
        Some(block as u64 * self.block_size as u64 + off as u64)
    }

    fn status(result: io::Result<()>) -> i32 {
        match result {
            Ok(()) => 0,
            Err(e) => {
                warn!("image I/O failed: {}", e);
                Error::IO
            }
        }
    }

    /// Read `buf.len()` bytes at `off` within `block`.
    pub fn read(&self, block: u32, off: u32, buf: &mut [u8]) -> i32 {
        let Some(pos) = self.offset(block, off, buf.len()) else {
            return Error::INVAL;
        };
        let mut file = self.file.borrow_mut();
        Self::status(file.seek(SeekFrom::Start(pos)).and_then(|_| file.read_exact(buf)))
    }

    /// Write `buf` at `off` within `block`.
    pub fn prog(&self, block: u32, off: u32, buf: &[u8]) -> i32 {
        let Some(pos) = self.offset(block, off, buf.len()) else {
            return Error::INVAL;
        };
        let mut file = self.file.borrow_mut();
        Self::status(file.seek(SeekFrom::Start(pos)).and_then(|_| file.write_all(buf)))
    }

    /// Fill `block` with [`ERASED`].
    pub fn erase(&self, block: u32) -> i32 {
        let Some(pos) = self.offset(block, 0, self.block_size as usize) else {
            return Error::INVAL;
        };
        let erased = vec![ERASED; self.block_size as usize];
        let mut file = self.file.borrow_mut();
        Self::status(file.seek(SeekFrom::Start(pos)).and_then(|_| file.write_all(&erased)))
    }

    /// Flush written data to the host file.
    pub fn sync(&self) -> i32 {
        let mut file = self.file.borrow_mut();
        Self::status(file.flush().and_then(|_| file.sync_data()))
    }
}
