//! Path parsing utilities for CLI commands
//!
//! Commands take path specifications that say whether a path lives on the
//! host or inside a flash image.
//!
//! # Path Notation
//!
//! - `image.img:path/to/file` - Path within the flash image
//! - `./path/to/file` or `/path/to/file` - Path on host filesystem
//!
//! This is similar to the familiar `host:path` syntax used by tools like scp and rsync.
//! An empty path after the colon (`image.img:`) names the image's root directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// A parsed path specification that can be either a host path or an image path
#[derive(Debug, Clone, PartialEq)]
pub enum PathSpec {
    /// Path within a flash image (e.g., "flash.img:logs/boot.txt")
    ImagePath { image: PathBuf, path: String },
    /// Path on the host filesystem (e.g., "./boot.txt")
    HostPath(PathBuf),
}

fn is_drive_letter(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}

impl PathSpec {
    /// Parse a path specification string into a PathSpec
    ///
    /// # Syntax
    ///
    /// - `image:path` - Explicit image path (e.g., "flash.img:dir/file.txt")
    /// - Anything else - Host filesystem path
    ///
    /// # Examples
    ///
    /// ```
    /// use flashfs_cli::path_parser::PathSpec;
    ///
    /// let spec = PathSpec::parse("flash.img:file.txt");
    /// assert!(spec.is_image_path());
    ///
    /// let spec = PathSpec::parse("./file.txt");
    /// assert!(spec.is_host_path());
    /// ```
    pub fn parse(spec: &str) -> Self {
        match spec.split_once(':') {
            // "C:\file.txt" is a Windows host path
            Some((img, _)) if cfg!(windows) && is_drive_letter(img) => {
                PathSpec::HostPath(PathBuf::from(spec))
            }
            Some((img, path)) => PathSpec::ImagePath {
                image: PathBuf::from(img),
                path: path.to_string(),
            },
            None => PathSpec::HostPath(PathBuf::from(spec)),
        }
    }

    /// Parse a specification that must name a path inside an image
    pub fn parse_image(spec: &str) -> Result<(PathBuf, String)> {
        match Self::parse(spec) {
            PathSpec::ImagePath { image, path } => Ok((image, path)),
            PathSpec::HostPath(_) => bail!(
                "'{}' is not an image path. Use 'image.img:path' notation, e.g. 'flash.img:{}'",
                spec,
                spec
            ),
        }
    }

    /// Get the image path if this is an ImagePath
    pub fn image_path(&self) -> Option<&Path> {
        match self {
            PathSpec::ImagePath { image, .. } => Some(image),
            PathSpec::HostPath(_) => None,
        }
    }

    /// Get the path within the image if this is an ImagePath
    pub fn inner_path(&self) -> Option<&str> {
        match self {
            PathSpec::ImagePath { path, .. } => Some(path),
            PathSpec::HostPath(_) => None,
        }
    }

    /// Get the host path if this is a HostPath
    pub fn host_path(&self) -> Option<&Path> {
        match self {
            PathSpec::HostPath(path) => Some(path),
            PathSpec::ImagePath { .. } => None,
        }
    }

    /// Returns true if this is an image path
    pub fn is_image_path(&self) -> bool {
        matches!(self, PathSpec::ImagePath { .. })
    }

    /// Returns true if this is a host path
    pub fn is_host_path(&self) -> bool {
        matches!(self, PathSpec::HostPath(_))
    }
}

/// Parse a copy between the host and an image
///
/// Exactly one side must be an image path.
pub fn parse_copy_operation(source: &str, dest: &str) -> Result<(PathSpec, PathSpec)> {
    let src = PathSpec::parse(source);
    let dst = PathSpec::parse(dest);

    match (&src, &dst) {
        (PathSpec::ImagePath { .. }, PathSpec::ImagePath { .. }) => {
            bail!(
                "Cannot copy between image paths '{}' and '{}'. Use 'get' then 'put', or 'mv' within one image.",
                source,
                dest
            );
        }
        (PathSpec::HostPath(_), PathSpec::HostPath(_)) => {
            bail!(
                "Cannot copy within host filesystem. Use standard tools like 'cp' instead.\n\
                To copy to/from images, use notation like 'flashfs put source.txt flash.img:dest.txt'"
            );
        }
        _ => {}
    }

    Ok((src, dst))
}

/// Require `spec` to be a host path, for the host side of a copy
pub fn expect_host(spec: &PathSpec) -> Result<&Path> {
    spec.host_path()
        .with_context(|| format!("Expected a host path, got image path {:?}", spec))
}
