//! Command-line tools for flashfs images.
//!
//! An image is a host file holding the raw contents of a flash device. Its
//! geometry is kept next to it in a `<image>.geom` sidecar written by
//! `flashfs format`, so later commands can reopen it without repeating the
//! layout.

pub mod cli;
pub mod geom;
pub mod path_parser;
