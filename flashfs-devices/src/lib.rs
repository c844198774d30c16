//! Block-I/O contexts for flashfs engines.
//!
//! Each device here exposes four associated functions with exactly the
//! callback signatures an [`EngineConfig`](flashfs::EngineConfig) expects, and
//! an `into_config` shortcut that wires them up:
//!
//! - **`RamFlash`**: NOR-like flash emulated in RAM (always available)
//! - **`FileFlash`**: flash image in a host file (requires `std`)
//! - **`NorFlashDevice`**: any `embedded-storage` NOR flash (requires
//!   `embedded-storage`)
//!
//! Callbacks report failures with the engine's negative error codes
//! ([`Error::IO`](flashfs::Error::IO), [`Error::INVAL`](flashfs::Error::INVAL)).
//!
//! # Features
//!
//! - `std`: Enable `FileFlash`
//! - `embedded-storage`: Enable `NorFlashDevice`
//! - `log`: Enable logging support
//! - `defmt`: Enable defmt logging for embedded

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

mod ram;

#[cfg(feature = "std")]
mod file;

#[cfg(feature = "embedded-storage")]
mod nor_flash;

pub use ram::{ERASED, RamFlash};

#[cfg(feature = "std")]
pub use file::FileFlash;

#[cfg(feature = "embedded-storage")]
pub use nor_flash::{NorFlashDevice, NorFlashRegion};
