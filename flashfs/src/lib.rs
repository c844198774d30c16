//! Handle-based file and directory API over an embedded flash filesystem engine.
//!
//! This crate does not store anything itself. It sits between callers and a
//! wear-leveling flash filesystem engine (littlefs or anything with the same
//! contract) and does two jobs:
//!
//! - **Result translation**: the engine speaks raw `i32` codes; callers get
//!   [`Result`]s carrying a typed [`Error`].
//! - **Descriptor tables**: open files and directories are identified by
//!   small integer handles ([`FileHandle`], [`DirHandle`]). The engine's
//!   cursors stay private to the [`Filesystem`] session.
//!
//! # Architecture
//!
//! ```text
//!     caller ──► Filesystem ──► Engine / EngineMut ──► EngineConfig callbacks ──► flash
//!                (handles)      (port traits)          (read/prog/erase/sync)
//! ```
//!
//! - [`EngineConfig`]: geometry, block-I/O context and callbacks
//! - [`Engine`] / [`EngineMut`]: the port an engine implements
//! - [`Filesystem`]: the session with its two descriptor tables
//! - [`ReadOnly`]: restricts any engine to the read side at compile time
//!
//! # Quick Start
//!
//! ```ignore
//! use flashfs::{Filesystem, Geometry, OpenFlags};
//! use flashfs_devices::RamFlash;
//! use flashfs_simfs::SimEngine;
//!
//! let geometry = Geometry::new(16, 16, 256, 4, 500, 16, 8);
//! let cfg = RamFlash::new(geometry).into_config(geometry);
//! let mut fs = Filesystem::new(SimEngine::new(), &cfg);
//!
//! fs.format()?;
//! fs.mount()?;
//! let fd = fs.open("a.txt", OpenFlags::CREAT | OpenFlags::WRONLY)?;
//! fs.write(fd, b"0123456789")?;
//! fs.close(fd)?;
//! ```
//!
//! # Features
//!
//! - `log`: Enable logging through the `log` crate
//! - `defmt`: Enable defmt logging for embedded

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod engine;
pub mod error;
pub mod flags;
pub mod handle;

mod filesystem;
mod state;

pub use config::{EngineConfig, EraseFn, Geometry, ProgFn, ReadFn, SyncFn};
pub use engine::{Engine, EngineMut, EntryInfo, ReadOnly};
pub use error::{Error, Result};
pub use filesystem::{DirEntry, Filesystem};
pub use flags::{EntryType, OpenFlags, Whence};
pub use handle::{DirHandle, FileHandle};
pub use state::MountState;
