//! NOR flash device for embedded-storage traits
//!
//! This module provides a block-I/O context that wraps types implementing the
//! `embedded-storage` NOR flash traits, so a flashfs engine can live in a
//! region of internal or external SPI flash.
//!
//! # Example
//!
//! ```ignore
//! use esp_storage::FlashStorage as EspFlash;
//! use flashfs_devices::{NorFlashDevice, NorFlashRegion};
//!
//! let region = NorFlashRegion::new(0x3C_0000, 4096, 64); // 256KB at offset
//! let device = NorFlashDevice::new(EspFlash::new(), region);
//! let geometry = device.geometry();
//! let cfg = device.into_config(geometry);
//! ```

use core::cell::RefCell;

use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use flashfs::{EngineConfig, Error, Geometry};

/// Location and layout of the filesystem inside the flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NorFlashRegion {
    /// Start offset in flash (must be erase-sector aligned)
    pub start_offset: u32,
    /// Size of one filesystem block (a multiple of the erase size)
    pub block_size: u32,
    /// Number of blocks in the region
    pub block_count: u32,
}

impl NorFlashRegion {
    /// Describe a region of `block_count` blocks starting at `start_offset`.
    pub const fn new(start_offset: u32, block_size: u32, block_count: u32) -> Self {
        Self {
            start_offset,
            block_size,
            block_count,
        }
    }

    /// Region using the last 256KB of a 4MB flash in 4KB blocks.
    pub const fn last_256k_of_4mb() -> Self {
        Self::new(0x3C_0000, 4096, 64)
    }

    /// Total size of the region in bytes.
    #[inline]
    pub const fn total_size(&self) -> u32 {
        self.block_size * self.block_count
    }
}

/// Block-I/O context over an `embedded-storage` NOR flash.
///
/// The engine callbacks receive `&self`, while `embedded-storage` needs
/// `&mut` access, so the flash sits in a `RefCell`.
pub struct NorFlashDevice<F> {
    flash: RefCell<F>,
    region: NorFlashRegion,
}

impl<F: NorFlash + ReadNorFlash> NorFlashDevice<F> {
    /// Wrap `flash`, placing the filesystem in `region`.
    ///
    /// # Panics
    /// Panics if the region start or block size is not a multiple of the
    /// flash's erase size, or if the region does not fit in the flash.
    pub fn new(flash: F, region: NorFlashRegion) -> Self {
        assert!(
            region.start_offset as usize % F::ERASE_SIZE == 0,
            "start_offset must be erase-sector aligned"
        );
        assert!(
            region.block_size as usize % F::ERASE_SIZE == 0,
            "block_size must be a multiple of the erase size"
        );
        assert!(
            region.start_offset as usize + region.total_size() as usize <= flash.capacity(),
            "region exceeds flash capacity"
        );
        Self {
            flash: RefCell::new(flash),
            region,
        }
    }

    /// Geometry matching the flash's read, write and erase granularity.
    pub fn geometry(&self) -> Geometry {
        let read_size = F::READ_SIZE as u32;
        let prog_size = F::WRITE_SIZE as u32;
        Geometry::new(
            read_size,
            prog_size,
            self.region.block_size,
            self.region.block_count,
            500,
            self.region.block_size,
            16,
        )
    }

    /// Build an engine configuration wired to this device.
    pub fn into_config(self, geometry: Geometry) -> EngineConfig<Self> {
        EngineConfig::new(self, Self::read, Self::prog, Self::erase, Self::sync, geometry)
    }

    /// The region this device covers.
    pub fn region(&self) -> &NorFlashRegion {
        &self.region
    }

    /// Consume the device and return the underlying flash.
    pub fn into_inner(self) -> F {
        self.flash.into_inner()
    }

    /// Convert a block address and in-block offset to a flash offset.
    #[inline]
    fn offset(&self, block: u32, off: u32, len: usize) -> Option<u32> {
        if block >= self.region.block_count || off as usize + len > self.region.block_size as usize
        {
            return None;
        }
        Some(self.region.start_offset + block * self.region.block_size + off)
    }

    /// Read `buf.len()` bytes at `off` within `block`.
    pub fn read(&self, block: u32, off: u32, buf: &mut [u8]) -> i32 {
        let Some(offset) = self.offset(block, off, buf.len()) else {
            return Error::INVAL;
        };
        match self.flash.borrow_mut().read(offset, buf) {
            Ok(()) => 0,
            Err(_) => {
                warn!("flash read failed at {}", offset);
                Error::IO
            }
        }
    }

    /// Program `buf` at `off` within `block`.
    pub fn prog(&self, block: u32, off: u32, buf: &[u8]) -> i32 {
        let Some(offset) = self.offset(block, off, buf.len()) else {
            return Error::INVAL;
        };
        match self.flash.borrow_mut().write(offset, buf) {
            Ok(()) => 0,
            Err(_) => {
                warn!("flash write failed at {}", offset);
                Error::IO
            }
        }
    }

    /// Erase `block`.
    pub fn erase(&self, block: u32) -> i32 {
        let Some(from) = self.offset(block, 0, self.region.block_size as usize) else {
            return Error::INVAL;
        };
        match self.flash.borrow_mut().erase(from, from + self.region.block_size) {
            Ok(()) => 0,
            Err(_) => {
                warn!("flash erase failed at {}", from);
                Error::IO
            }
        }
    }

    /// NOR flash writes are synchronous.
    pub fn sync(&self) -> i32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTOR: usize = 256;

    /// Mock NOR flash for testing
    struct MockFlash {
        data: [[u8; SECTOR]; 16],
    }

    impl MockFlash {
        fn new() -> Self {
            Self {
                data: [[0xFF; SECTOR]; 16],
            }
        }
    }

    impl embedded_storage::nor_flash::ErrorType for MockFlash {
        type Error = MockFlashError;
    }

    #[derive(Debug)]
    struct MockFlashError;

    impl embedded_storage::nor_flash::NorFlashError for MockFlashError {
        fn kind(&self) -> embedded_storage::nor_flash::NorFlashErrorKind {
            embedded_storage::nor_flash::NorFlashErrorKind::Other
        }
    }

    impl ReadNorFlash for MockFlash {
        const READ_SIZE: usize = 1;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let page = offset as usize / SECTOR;
            let page_offset = offset as usize % SECTOR;
            if page < self.data.len() && page_offset + bytes.len() <= SECTOR {
                bytes.copy_from_slice(&self.data[page][page_offset..page_offset + bytes.len()]);
                Ok(())
            } else {
                Err(MockFlashError)
            }
        }

        fn capacity(&self) -> usize {
            self.data.len() * SECTOR
        }
    }

    impl NorFlash for MockFlash {
        const WRITE_SIZE: usize = 4;
        const ERASE_SIZE: usize = SECTOR;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            let start_page = from as usize / SECTOR;
            let end_page = (to as usize).div_ceil(SECTOR);
            for page in start_page..end_page.min(self.data.len()) {
                self.data[page] = [0xFF; SECTOR];
            }
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            let page = offset as usize / SECTOR;
            let page_offset = offset as usize % SECTOR;
            if page < self.data.len() && page_offset + bytes.len() <= SECTOR {
                for (dst, src) in self.data[page][page_offset..].iter_mut().zip(bytes) {
                    *dst &= *src;
                }
                Ok(())
            } else {
                Err(MockFlashError)
            }
        }
    }

    #[test]
    fn test_nor_flash_device_read_write() {
        let region = NorFlashRegion::new(4 * SECTOR as u32, SECTOR as u32, 8);
        let device = NorFlashDevice::new(MockFlash::new(), region);

        assert_eq!(device.prog(1, 8, &[42u8; 8]), 0);

        let mut buf = [0u8; 8];
        assert_eq!(device.read(1, 8, &mut buf), 0);
        assert_eq!(buf, [42; 8]);

        // Block 1 of the region is sector 5 of the flash.
        let flash = device.into_inner();
        assert_eq!(flash.data[5][8], 42);
        assert_eq!(flash.data[1][8], 0xFF);
    }

    #[test]
    fn test_nor_flash_device_erase() {
        let region = NorFlashRegion::new(0, SECTOR as u32, 4);
        let device = NorFlashDevice::new(MockFlash::new(), region);

        assert_eq!(device.prog(2, 0, &[0u8; 4]), 0);
        assert_eq!(device.erase(2), 0);

        let mut buf = [0u8; 4];
        assert_eq!(device.read(2, 0, &mut buf), 0);
        assert_eq!(buf, [0xFF; 4]);
        assert_eq!(device.sync(), 0);
    }

    #[test]
    fn test_nor_flash_device_bounds() {
        let region = NorFlashRegion::new(0, SECTOR as u32, 4);
        let device = NorFlashDevice::new(MockFlash::new(), region);

        let mut buf = [0u8; 4];
        assert_eq!(device.read(4, 0, &mut buf), Error::INVAL);
        assert_eq!(device.prog(0, SECTOR as u32 - 2, &buf), Error::INVAL);
        assert_eq!(device.erase(7), Error::INVAL);
    }

    #[test]
    fn test_nor_flash_geometry() {
        let region = NorFlashRegion::new(0, SECTOR as u32, 4);
        let geometry = NorFlashDevice::new(MockFlash::new(), region).geometry();
        assert_eq!(geometry.read_size, 1);
        assert_eq!(geometry.prog_size, 4);
        assert_eq!(geometry.block_size, SECTOR as u32);
        assert_eq!(geometry.block_count, 4);
        assert_eq!(geometry.capacity(), 4 * SECTOR as u64);
    }

    #[test]
    fn test_region_presets() {
        let region = NorFlashRegion::last_256k_of_4mb();
        assert_eq!(region.start_offset, 0x3C_0000);
        assert_eq!(region.total_size(), 256 * 1024);
    }

    #[test]
    #[should_panic(expected = "erase-sector aligned")]
    fn test_region_unaligned() {
        let _ = NorFlashDevice::new(MockFlash::new(), NorFlashRegion::new(0x10, SECTOR as u32, 4));
    }
}
