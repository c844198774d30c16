//! In-memory flash.

use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::ops::Range;

use flashfs::{EngineConfig, Error, Geometry};

/// Value of an erased byte.
pub const ERASED: u8 = 0xFF;

/// Flash emulated in RAM.
///
/// Behaves like NOR flash: erasing sets a block to [`ERASED`], programming
/// can only clear bits, so programming a block twice without an erase in
/// between ANDs the two writes together.
///
/// The associated functions [`RamFlash::read`], [`RamFlash::prog`],
/// [`RamFlash::erase`] and [`RamFlash::sync`] have exactly the callback
/// signatures of [`EngineConfig`].
///
/// # Example
///
/// ```
/// use flashfs::Geometry;
/// use flashfs_devices::RamFlash;
///
/// let geometry = Geometry::new(16, 16, 256, 4, 500, 16, 8);
/// let cfg = RamFlash::new(geometry).into_config(geometry);
///
/// let mut buf = [0u8; 4];
/// assert_eq!(cfg.read(0, 0, &mut buf), 0);
/// assert_eq!(buf, [0xFF; 4]);
/// ```
#[derive(Debug)]
pub struct RamFlash {
    data: RefCell<Vec<u8>>,
    block_size: u32,
    block_count: u32,
    write_protected: Cell<bool>,
}

impl RamFlash {
    /// Create an erased device matching `geometry`.
    pub fn new(geometry: Geometry) -> Self {
        Self::with_blocks(geometry.block_size, geometry.block_count)
    }

    /// Create an erased device of `block_count` blocks of `block_size` bytes.
    pub fn with_blocks(block_size: u32, block_count: u32) -> Self {
        let len = block_size as usize * block_count as usize;
        Self {
            data: RefCell::new(vec![ERASED; len]),
            block_size,
            block_count,
            write_protected: Cell::new(false),
        }
    }

    /// Create a device from a previously taken [`RamFlash::snapshot`].
    ///
    /// Trailing bytes that do not fill a whole block are dropped. A zero
    /// `block_size` yields a device with no blocks.
    pub fn from_image(mut image: Vec<u8>, block_size: u32) -> Self {
        let block_count = image.len().checked_div(block_size as usize).unwrap_or(0) as u32;
        image.truncate(block_count as usize * block_size as usize);
        Self {
            data: RefCell::new(image),
            block_size,
            block_count,
            write_protected: Cell::new(false),
        }
    }

    /// Build an engine configuration wired to this device.
    pub fn into_config(self, geometry: Geometry) -> EngineConfig<Self> {
        EngineConfig::new(self, Self::read, Self::prog, Self::erase, Self::sync, geometry)
    }

    /// Copy of the raw device contents.
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }

    /// Number of blocks on the device.
    #[inline]
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Size of one block in bytes.
    #[inline]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Reject every program and erase with an I/O error while set.
    pub fn set_write_protected(&self, protected: bool) {
        self.write_protected.set(protected);
    }

    fn range(&self, block: u32, off: u32, len: usize) -> Option<Range<usize>> {
        if block >= self.block_count || off as usize + len > self.block_size as usize {
            return None;
        }
        let start = block as usize * self.block_size as usize + off as usize;
        Some(start..start + len)
    }

    /// Read `buf.len()` bytes at `off` within `block`.
    pub fn read(&self, block: u32, off: u32, buf: &mut [u8]) -> i32 {
        let Some(range) = self.range(block, off, buf.len()) else {
            warn!("read out of range: block {} off {} len {}", block, off, buf.len());
            return Error::INVAL;
        };
        buf.copy_from_slice(&self.data.borrow()[range]);
        0
    }

    /// Program `buf` at `off` within `block`, clearing bits only.
    pub fn prog(&self, block: u32, off: u32, buf: &[u8]) -> i32 {
        if self.write_protected.get() {
            return Error::IO;
        }
        let Some(range) = self.range(block, off, buf.len()) else {
            warn!("prog out of range: block {} off {} len {}", block, off, buf.len());
            return Error::INVAL;
        };
        let mut data = self.data.borrow_mut();
        for (dst, src) in data[range].iter_mut().zip(buf) {
            *dst &= *src;
        }
        0
    }

    /// Erase `block`.
    pub fn erase(&self, block: u32) -> i32 {
        if self.write_protected.get() {
            return Error::IO;
        }
        let Some(range) = self.range(block, 0, self.block_size as usize) else {
            warn!("erase out of range: block {}", block);
            return Error::INVAL;
        };
        self.data.borrow_mut()[range].fill(ERASED);
        0
    }

    /// Nothing is buffered, so this always succeeds.
    pub fn sync(&self) -> i32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_device_is_erased() {
        let flash = RamFlash::with_blocks(64, 4);
        assert_eq!(flash.snapshot(), vec![ERASED; 256]);
        assert_eq!(flash.block_count(), 4);
        assert_eq!(flash.block_size(), 64);
    }

    #[test]
    fn test_prog_clears_bits_only() {
        let flash = RamFlash::with_blocks(64, 2);
        assert_eq!(flash.prog(1, 8, &[0b1010_1010]), 0);
        assert_eq!(flash.prog(1, 8, &[0b0110_0110]), 0);

        let mut buf = [0u8; 1];
        assert_eq!(flash.read(1, 8, &mut buf), 0);
        assert_eq!(buf[0], 0b0010_0010);

        assert_eq!(flash.erase(1), 0);
        assert_eq!(flash.read(1, 8, &mut buf), 0);
        assert_eq!(buf[0], ERASED);
    }

    #[test]
    fn test_out_of_range_access() {
        let flash = RamFlash::with_blocks(64, 2);
        let mut buf = [0u8; 8];
        assert_eq!(flash.read(2, 0, &mut buf), Error::INVAL);
        assert_eq!(flash.read(1, 60, &mut buf), Error::INVAL);
        assert_eq!(flash.prog(0, 57, &buf), Error::INVAL);
        assert_eq!(flash.erase(5), Error::INVAL);
    }

    #[test]
    fn test_write_protect() {
        let flash = RamFlash::with_blocks(64, 2);
        flash.set_write_protected(true);
        assert_eq!(flash.prog(0, 0, &[0]), Error::IO);
        assert_eq!(flash.erase(0), Error::IO);

        flash.set_write_protected(false);
        assert_eq!(flash.prog(0, 0, &[0]), 0);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let flash = RamFlash::with_blocks(32, 2);
        assert_eq!(flash.prog(0, 0, b"flash"), 0);
        let mut image = flash.snapshot();
        image.push(0); // partial trailing block is dropped

        let restored = RamFlash::from_image(image, 32);
        assert_eq!(restored.block_count(), 2);
        let mut buf = [0u8; 5];
        assert_eq!(restored.read(0, 0, &mut buf), 0);
        assert_eq!(&buf, b"flash");
    }

    #[test]
    fn test_from_image_zero_block_size() {
        let flash = RamFlash::from_image(vec![0xFF; 64], 0);
        assert_eq!(flash.block_count(), 0);
        assert!(flash.snapshot().is_empty());
        let mut buf = [0u8; 1];
        assert_eq!(flash.read(0, 0, &mut buf), Error::INVAL);
        assert_eq!(flash.erase(0), Error::INVAL);
    }

    #[test]
    fn test_config_wiring() {
        let geometry = Geometry::new(16, 16, 128, 2, 100, 16, 8);
        let cfg = RamFlash::new(geometry).into_config(geometry);
        assert_eq!(cfg.prog(1, 0, &[0x00; 16]), 0);
        assert_eq!(cfg.sync(), 0);
        assert_eq!(cfg.context().snapshot()[128..144], [0x00; 16]);
    }
}
