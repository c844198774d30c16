//! Engine port - the filesystem algorithm behind the adapter.
//!
//! The adapter never implements storage semantics itself. It drives an
//! engine through the [`Engine`] trait (operations every build supports)
//! and, for write-capable engines, [`EngineMut`].
//!
//! ```text
//! ┌─────────────────────┐
//! │     Filesystem      │  handles, result translation
//! └──────────┬──────────┘
//!            │ depends on
//!            ▼
//! ┌─────────────────────┐
//! │ Engine / EngineMut  │  ◄── This module
//! └──────────┬──────────┘
//!            │ implemented by
//!            ▼
//! ┌─────────────────────┐
//! │ littlefs-style      │
//! │ engine              │
//! └──────────┬──────────┘
//!            │ calls
//!            ▼
//! ┌─────────────────────┐
//! │ EngineConfig        │  read / prog / erase / sync
//! │ callbacks           │
//! └─────────────────────┘
//! ```
//!
//! # Return codes
//!
//! Every method returns a raw `i32`: zero or a positive value on success,
//! a negative [`Error`] code on failure. The adapter translates these; an
//! engine never constructs a `Result`.
//!
//! # Cursors
//!
//! Open files and directories are represented by the associated types
//! [`Engine::File`] and [`Engine::Dir`]. The adapter allocates each cursor
//! on the heap before asking the engine to initialise it, and keeps it at the
//! same address until the handle is closed.

use alloc::string::String;

use crate::config::EngineConfig;
use crate::error::Error;
use crate::flags::OpenFlags;

/// Metadata of one directory entry as filled in by [`Engine::dir_read`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryInfo {
    /// Raw entry type, see [`EntryType`](crate::EntryType).
    pub kind: u8,
    /// Size in bytes, only meaningful for regular files.
    pub size: u32,
    /// Entry name without its parent path.
    pub name: String,
}

/// Read side of a flash filesystem engine.
///
/// Engines that only implement this trait are read-only: a
/// [`Filesystem`](crate::Filesystem) over them has no `format`, `remove`,
/// `rename`, `mkdir`, `write` or `truncate` methods.
pub trait Engine {
    /// Block-I/O context carried by the configuration.
    type Context;
    /// Per-file cursor state.
    type File: Default;
    /// Per-directory cursor state.
    type Dir: Default;

    /// Mount the filesystem stored on the media.
    fn mount(&mut self, cfg: &EngineConfig<Self::Context>) -> i32;

    /// Release the mounted state.
    fn unmount(&mut self, cfg: &EngineConfig<Self::Context>) -> i32;

    /// Initialise `file` for the entry at `path`.
    fn file_open(
        &mut self,
        cfg: &EngineConfig<Self::Context>,
        file: &mut Self::File,
        path: &str,
        flags: OpenFlags,
    ) -> i32;

    /// Write back pending data and release `file`.
    fn file_close(&mut self, cfg: &EngineConfig<Self::Context>, file: &mut Self::File) -> i32;

    /// Write back pending data of `file`.
    fn file_sync(&mut self, cfg: &EngineConfig<Self::Context>, file: &mut Self::File) -> i32;

    /// Read into `buf`, returning the number of bytes read.
    fn file_read(
        &mut self,
        cfg: &EngineConfig<Self::Context>,
        file: &mut Self::File,
        buf: &mut [u8],
    ) -> i32;

    /// Move the position of `file`, returning the new position.
    ///
    /// `whence` is the raw value of a [`Whence`](crate::Whence).
    fn file_seek(
        &mut self,
        cfg: &EngineConfig<Self::Context>,
        file: &mut Self::File,
        off: i32,
        whence: i32,
    ) -> i32;

    /// Current position of `file`.
    fn file_tell(&mut self, cfg: &EngineConfig<Self::Context>, file: &mut Self::File) -> i32;

    /// Move the position of `file` back to the start.
    fn file_rewind(&mut self, cfg: &EngineConfig<Self::Context>, file: &mut Self::File) -> i32;

    /// Size of `file` in bytes, including data not yet written back.
    fn file_size(&mut self, cfg: &EngineConfig<Self::Context>, file: &mut Self::File) -> i32;

    /// Initialise `dir` for the directory at `path`.
    fn dir_open(
        &mut self,
        cfg: &EngineConfig<Self::Context>,
        dir: &mut Self::Dir,
        path: &str,
    ) -> i32;

    /// Release `dir`.
    fn dir_close(&mut self, cfg: &EngineConfig<Self::Context>, dir: &mut Self::Dir) -> i32;

    /// Fill `info` with the next entry.
    ///
    /// Returns a positive value when an entry was produced, zero when the
    /// directory has no more entries.
    fn dir_read(
        &mut self,
        cfg: &EngineConfig<Self::Context>,
        dir: &mut Self::Dir,
        info: &mut EntryInfo,
    ) -> i32;

    /// Restart iteration of `dir` from its first entry.
    fn dir_rewind(&mut self, cfg: &EngineConfig<Self::Context>, dir: &mut Self::Dir) -> i32;

    /// Number of blocks currently allocated.
    fn fs_size(&mut self, cfg: &EngineConfig<Self::Context>) -> i32;
}

/// Mutating side of a flash filesystem engine.
pub trait EngineMut: Engine {
    /// Write a fresh, empty filesystem to the media.
    fn format(&mut self, cfg: &EngineConfig<Self::Context>) -> i32;

    /// Remove a file or an empty directory.
    fn remove(&mut self, cfg: &EngineConfig<Self::Context>, path: &str) -> i32;

    /// Rename or move an entry, replacing a compatible destination.
    fn rename(&mut self, cfg: &EngineConfig<Self::Context>, old_path: &str, new_path: &str)
    -> i32;

    /// Create a directory.
    fn mkdir(&mut self, cfg: &EngineConfig<Self::Context>, path: &str) -> i32;

    /// Write `buf`, returning the number of bytes written.
    fn file_write(
        &mut self,
        cfg: &EngineConfig<Self::Context>,
        file: &mut Self::File,
        buf: &[u8],
    ) -> i32;

    /// Shrink or extend `file` to `size` bytes.
    fn file_truncate(
        &mut self,
        cfg: &EngineConfig<Self::Context>,
        file: &mut Self::File,
        size: u32,
    ) -> i32;
}

/// Restricts an engine to its read side.
///
/// A [`Filesystem`](crate::Filesystem) over `ReadOnly<E>` exposes no mutating
/// operations, even when `E` implements [`EngineMut`]. Opening with any flag
/// that implies writing fails with [`Error::Inval`] before the inner engine is
/// reached.
///
/// ```compile_fail
/// use flashfs::{Engine, Filesystem, ReadOnly};
///
/// fn wipe<E: Engine>(fs: &mut Filesystem<'_, ReadOnly<E>>) {
///     let _ = fs.format();
/// }
/// ```
#[derive(Debug, Default)]
pub struct ReadOnly<E>(E);

impl<E> ReadOnly<E> {
    /// Wrap `engine`.
    pub const fn new(engine: E) -> Self {
        Self(engine)
    }

    /// Access the wrapped engine.
    pub fn inner(&self) -> &E {
        &self.0
    }

    /// Unwrap the engine.
    pub fn into_inner(self) -> E {
        self.0
    }
}

impl<E: Engine> Engine for ReadOnly<E> {
    type Context = E::Context;
    type File = E::File;
    type Dir = E::Dir;

    fn mount(&mut self, cfg: &EngineConfig<Self::Context>) -> i32 {
        self.0.mount(cfg)
    }

    fn unmount(&mut self, cfg: &EngineConfig<Self::Context>) -> i32 {
        self.0.unmount(cfg)
    }

    fn file_open(
        &mut self,
        cfg: &EngineConfig<Self::Context>,
        file: &mut Self::File,
        path: &str,
        flags: OpenFlags,
    ) -> i32 {
        if flags.has_write_intent() {
            return Error::INVAL;
        }
        self.0.file_open(cfg, file, path, flags)
    }

    fn file_close(&mut self, cfg: &EngineConfig<Self::Context>, file: &mut Self::File) -> i32 {
        self.0.file_close(cfg, file)
    }

    fn file_sync(&mut self, cfg: &EngineConfig<Self::Context>, file: &mut Self::File) -> i32 {
        self.0.file_sync(cfg, file)
    }

    fn file_read(
        &mut self,
        cfg: &EngineConfig<Self::Context>,
        file: &mut Self::File,
        buf: &mut [u8],
    ) -> i32 {
        self.0.file_read(cfg, file, buf)
    }

    fn file_seek(
        &mut self,
        cfg: &EngineConfig<Self::Context>,
        file: &mut Self::File,
        off: i32,
        whence: i32,
    ) -> i32 {
        self.0.file_seek(cfg, file, off, whence)
    }

    fn file_tell(&mut self, cfg: &EngineConfig<Self::Context>, file: &mut Self::File) -> i32 {
        self.0.file_tell(cfg, file)
    }

    fn file_rewind(&mut self, cfg: &EngineConfig<Self::Context>, file: &mut Self::File) -> i32 {
        self.0.file_rewind(cfg, file)
    }

    fn file_size(&mut self, cfg: &EngineConfig<Self::Context>, file: &mut Self::File) -> i32 {
        self.0.file_size(cfg, file)
    }

    fn dir_open(
        &mut self,
        cfg: &EngineConfig<Self::Context>,
        dir: &mut Self::Dir,
        path: &str,
    ) -> i32 {
        self.0.dir_open(cfg, dir, path)
    }

    fn dir_close(&mut self, cfg: &EngineConfig<Self::Context>, dir: &mut Self::Dir) -> i32 {
        self.0.dir_close(cfg, dir)
    }

    fn dir_read(
        &mut self,
        cfg: &EngineConfig<Self::Context>,
        dir: &mut Self::Dir,
        info: &mut EntryInfo,
    ) -> i32 {
        self.0.dir_read(cfg, dir, info)
    }

    fn dir_rewind(&mut self, cfg: &EngineConfig<Self::Context>, dir: &mut Self::Dir) -> i32 {
        self.0.dir_rewind(cfg, dir)
    }

    fn fs_size(&mut self, cfg: &EngineConfig<Self::Context>) -> i32 {
        self.0.fs_size(cfg)
    }
}
