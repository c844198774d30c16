//! Engine configuration.
//!
//! An [`EngineConfig`] bundles everything an engine needs to reach the media:
//! the [`Geometry`] of the flash, a block-I/O context, and the four callbacks
//! that read, program, erase and sync blocks through that context.
//!
//! Nothing is validated here. Inconsistent geometry is reported by the engine
//! as [`Error::Inval`](crate::Error::Inval) on `format` or `mount`.

use core::fmt;

/// Read `buf.len()` bytes at `off` within `block`.
pub type ReadFn<C> = fn(ctx: &C, block: u32, off: u32, buf: &mut [u8]) -> i32;

/// Program `buf` at `off` within an erased `block`.
pub type ProgFn<C> = fn(ctx: &C, block: u32, off: u32, buf: &[u8]) -> i32;

/// Erase `block`.
pub type EraseFn<C> = fn(ctx: &C, block: u32) -> i32;

/// Flush any state the device buffers.
pub type SyncFn<C> = fn(ctx: &C) -> i32;

/// Flash geometry and engine tuning parameters.
///
/// All sizes are in bytes except `block_count`. `block_cycles` is the number
/// of erase cycles before the engine relocates metadata; negative values
/// disable wear leveling.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Minimum size of a block read.
    pub read_size: u32,
    /// Minimum size of a block program.
    pub prog_size: u32,
    /// Size of an erasable block.
    pub block_size: u32,
    /// Number of erasable blocks on the device.
    pub block_count: u32,
    /// Erase cycles before metadata is moved, or negative for no wear leveling.
    pub block_cycles: i32,
    /// Size of the read and program caches.
    pub cache_size: u32,
    /// Size of the lookahead buffer.
    pub lookahead_size: u32,
}

impl Geometry {
    /// Create a geometry from its raw parts.
    ///
    /// # Examples
    ///
    /// ```
    /// use flashfs::Geometry;
    ///
    /// let geometry = Geometry::new(16, 16, 256, 4, 500, 16, 8);
    /// assert_eq!(geometry.capacity(), 1024);
    /// ```
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        read_size: u32,
        prog_size: u32,
        block_size: u32,
        block_count: u32,
        block_cycles: i32,
        cache_size: u32,
        lookahead_size: u32,
    ) -> Self {
        Self {
            read_size,
            prog_size,
            block_size,
            block_count,
            block_cycles,
            cache_size,
            lookahead_size,
        }
    }

    /// Total size of the device in bytes.
    #[inline]
    pub const fn capacity(&self) -> u64 {
        self.block_size as u64 * self.block_count as u64
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} blocks x {} bytes (read {}, prog {}, cache {}, lookahead {}, cycles {})",
            self.block_count,
            self.block_size,
            self.read_size,
            self.prog_size,
            self.cache_size,
            self.lookahead_size,
            self.block_cycles
        )
    }
}

/// Parameters handed to the engine on every call.
///
/// A [`Filesystem`](crate::Filesystem) borrows its configuration for its whole
/// lifetime, so the configuration necessarily outlives the session.
pub struct EngineConfig<C> {
    context: C,
    read: ReadFn<C>,
    prog: ProgFn<C>,
    erase: EraseFn<C>,
    sync: SyncFn<C>,
    geometry: Geometry,
}

impl<C> EngineConfig<C> {
    /// Assemble a configuration. Every argument is stored as given.
    pub const fn new(
        context: C,
        read: ReadFn<C>,
        prog: ProgFn<C>,
        erase: EraseFn<C>,
        sync: SyncFn<C>,
        geometry: Geometry,
    ) -> Self {
        Self {
            context,
            read,
            prog,
            erase,
            sync,
            geometry,
        }
    }

    /// The geometry this configuration was built with.
    #[inline]
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The block-I/O context passed to every callback.
    #[inline]
    pub const fn context(&self) -> &C {
        &self.context
    }

    /// Consume the configuration and return the context.
    pub fn into_context(self) -> C {
        self.context
    }

    /// Invoke the read callback.
    #[inline]
    pub fn read(&self, block: u32, off: u32, buf: &mut [u8]) -> i32 {
        (self.read)(&self.context, block, off, buf)
    }

    /// Invoke the program callback.
    #[inline]
    pub fn prog(&self, block: u32, off: u32, buf: &[u8]) -> i32 {
        (self.prog)(&self.context, block, off, buf)
    }

    /// Invoke the erase callback.
    #[inline]
    pub fn erase(&self, block: u32) -> i32 {
        (self.erase)(&self.context, block)
    }

    /// Invoke the sync callback.
    #[inline]
    pub fn sync(&self) -> i32 {
        (self.sync)(&self.context)
    }
}

impl<C: fmt::Debug> fmt::Debug for EngineConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("context", &self.context)
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}
