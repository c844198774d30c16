//! A reference engine for flashfs.
//!
//! [`SimEngine`] implements [`Engine`](flashfs::Engine) and
//! [`EngineMut`](flashfs::EngineMut) with the semantics of a littlefs-style
//! engine: buffered file cursors committed on sync or close, directory
//! listings starting with `.` and `..`, and the usual error codes for
//! missing, existing or non-empty entries.
//!
//! It keeps no wear-leveling or power-loss guarantees. The whole tree is held
//! in memory and rewritten as one image on every commit:
//!
//! ```text
//! ┌─────────────────────┐
//! │ Filesystem          │
//! └──────────┬──────────┘
//!            ▼
//! ┌─────────────────────┐     ┌──────────────────────┐
//! │ SimEngine           │────►│ Tree (BTreeMap)      │
//! └──────────┬──────────┘     └──────────────────────┘
//!            │ postcard + CRC-32 image
//!            ▼
//! ┌─────────────────────┐
//! │ EngineConfig        │  erase / prog / read / sync
//! └─────────────────────┘
//! ```
//!
//! # Features
//!
//! - `log`: Enable logging support
//! - `defmt`: Enable defmt logging for embedded

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

mod engine;
mod image;
pub mod path;
mod tree;

pub use engine::{SimDir, SimEngine, SimFile, validate_geometry};
pub use image::{HEADER_LEN, MAGIC};
