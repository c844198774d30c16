//! On-media image layout.
//!
//! The committed tree is stored as one contiguous image starting at block 0:
//!
//! ```text
//! offset 0        8          12         16
//!        ┌────────┬──────────┬──────────┬──────────────────────┐
//!        │ magic  │ length   │ CRC-32   │ payload (postcard)   │
//!        │ 8 B    │ u32 LE   │ u32 LE   │ `length` bytes       │
//!        └────────┴──────────┴──────────┴──────────────────────┘
//! ```
//!
//! Every block the image touches is erased and reprogrammed on each commit.
//! Blocks past the image are left alone.

use alloc::vec;
use alloc::vec::Vec;

use crc::{CRC_32_ISO_HDLC, Crc};
use flashfs::{EngineConfig, Error, Geometry};

/// Marks the first block of a formatted image.
pub const MAGIC: [u8; 8] = *b"flashfs\x01";

/// Size of the image header in bytes.
pub const HEADER_LEN: usize = 16;

const CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

const ERASED: u8 = 0xFF;

/// Bytes available to the payload on a device of this geometry.
pub fn payload_capacity(geometry: &Geometry) -> usize {
    (geometry.capacity() as usize).saturating_sub(HEADER_LEN)
}

/// Number of blocks an image with `payload_len` payload bytes occupies.
pub fn blocks_for(geometry: &Geometry, payload_len: usize) -> u32 {
    (HEADER_LEN + payload_len).div_ceil(geometry.block_size as usize) as u32
}

fn rc(code: i32) -> Result<(), i32> {
    if code < 0 { Err(code) } else { Ok(()) }
}

/// Erase and program `payload` behind a fresh header, then sync the device.
///
/// Returns the number of blocks the image occupies.
pub fn store<C>(cfg: &EngineConfig<C>, payload: &[u8]) -> Result<u32, i32> {
    let geometry = cfg.geometry();
    if payload.len() > payload_capacity(geometry) {
        debug!("image of {} bytes does not fit", payload.len());
        return Err(Error::NOSPC);
    }

    let block_size = geometry.block_size as usize;
    let prog_size = geometry.prog_size as usize;
    let blocks = blocks_for(geometry, payload.len());

    let mut image = Vec::with_capacity(blocks as usize * block_size);
    image.extend_from_slice(&MAGIC);
    image.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    image.extend_from_slice(&CRC.checksum(payload).to_le_bytes());
    image.extend_from_slice(payload);
    let used = image.len().next_multiple_of(prog_size);
    image.resize(blocks as usize * block_size, ERASED);

    for (block, data) in image.chunks(block_size).enumerate() {
        let block = block as u32;
        rc(cfg.erase(block))?;
        let start = block as usize * block_size;
        for (i, chunk) in data.chunks(prog_size).enumerate() {
            if start + i * prog_size >= used {
                break;
            }
            rc(cfg.prog(block, (i * prog_size) as u32, chunk))?;
        }
    }
    rc(cfg.sync())?;

    trace!("stored {} byte image in {} blocks", payload.len(), blocks);
    Ok(blocks)
}

fn read_block<C>(cfg: &EngineConfig<C>, block: u32, out: &mut [u8]) -> Result<(), i32> {
    let read_size = cfg.geometry().read_size as usize;
    for (i, chunk) in out.chunks_mut(read_size).enumerate() {
        rc(cfg.read(block, (i * read_size) as u32, chunk))?;
    }
    Ok(())
}

/// Read and verify the image, returning its payload.
///
/// Media without a valid header or with a payload failing its checksum is
/// reported as [`Error::CORRUPT`].
pub fn load<C>(cfg: &EngineConfig<C>) -> Result<Vec<u8>, i32> {
    let geometry = cfg.geometry();
    let block_size = geometry.block_size as usize;

    let mut image = vec![0u8; block_size];
    read_block(cfg, 0, &mut image)?;

    if image[..8] != MAGIC {
        debug!("no image header found");
        return Err(Error::CORRUPT);
    }
    let len = u32::from_le_bytes([image[8], image[9], image[10], image[11]]) as usize;
    let crc = u32::from_le_bytes([image[12], image[13], image[14], image[15]]);
    if len > payload_capacity(geometry) {
        debug!("image length {} exceeds the device", len);
        return Err(Error::CORRUPT);
    }

    let blocks = blocks_for(geometry, len);
    image.resize(blocks as usize * block_size, 0);
    for block in 1..blocks {
        let start = block as usize * block_size;
        read_block(cfg, block, &mut image[start..start + block_size])?;
    }

    let payload = &image[HEADER_LEN..HEADER_LEN + len];
    if CRC.checksum(payload) != crc {
        debug!("image checksum mismatch");
        return Err(Error::CORRUPT);
    }
    Ok(payload.to_vec())
}
