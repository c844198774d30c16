//! Command definitions and their implementations

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use flashfs::{EntryType, Error, Filesystem, Geometry, OpenFlags};
use flashfs_devices::FileFlash;
use flashfs_simfs::SimEngine;

use crate::geom;
use crate::path_parser::{PathSpec, expect_host, parse_copy_operation};

/// Size of the buffer used to move file contents.
const CHUNK: usize = 512;

type Session<'a> = Filesystem<'a, SimEngine<FileFlash>>;

/// Inspect and edit flash filesystem images.
///
/// Paths inside an image are written `image.img:path`.
#[derive(Debug, Parser)]
#[command(name = "flashfs", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an erased image and format it
    Format {
        /// Image file to create (replaced if it exists)
        image: PathBuf,
        #[command(flatten)]
        geometry: GeometryArgs,
    },
    /// List a directory
    Ls {
        /// Directory, as image.img:path (image.img: for the root)
        dir: String,
    },
    /// Copy a host file into an image
    Put {
        /// Host file
        source: String,
        /// Destination, as image.img:path
        dest: String,
    },
    /// Copy a file out of an image
    Get {
        /// Source, as image.img:path
        source: String,
        /// Host file
        dest: String,
    },
    /// Print a file to stdout
    Cat {
        /// File, as image.img:path
        file: String,
    },
    /// Remove a file or an empty directory
    Rm {
        /// Entry, as image.img:path
        path: String,
    },
    /// Create a directory
    Mkdir {
        /// Directory, as image.img:path
        path: String,
    },
    /// Rename or move an entry within an image
    Mv {
        /// Entry, as image.img:path
        from: String,
        /// New path inside the same image
        to: String,
    },
    /// Show how much of an image is in use
    Df {
        /// Image file
        image: PathBuf,
    },
}

/// Flash layout used by `format`.
#[derive(Debug, Clone, Copy, Args)]
pub struct GeometryArgs {
    /// Minimum read size in bytes
    #[arg(long, default_value_t = 16)]
    pub read_size: u32,
    /// Minimum program size in bytes
    #[arg(long, default_value_t = 16)]
    pub prog_size: u32,
    /// Erase block size in bytes
    #[arg(long, default_value_t = 4096)]
    pub block_size: u32,
    /// Number of erase blocks
    #[arg(long, default_value_t = 256)]
    pub block_count: u32,
    /// Erase cycles before metadata moves (negative disables wear leveling)
    #[arg(long, default_value_t = 500, allow_negative_numbers = true)]
    pub block_cycles: i32,
    /// Cache size in bytes
    #[arg(long, default_value_t = 64)]
    pub cache_size: u32,
    /// Lookahead buffer size in bytes
    #[arg(long, default_value_t = 16)]
    pub lookahead_size: u32,
}

impl From<GeometryArgs> for Geometry {
    fn from(args: GeometryArgs) -> Self {
        Geometry::new(
            args.read_size,
            args.prog_size,
            args.block_size,
            args.block_count,
            args.block_cycles,
            args.cache_size,
            args.lookahead_size,
        )
    }
}

/// Run `cli`, writing command output to `out`.
pub fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    match cli.command {
        Command::Format { image, geometry } => format(&image, geometry.into(), out),
        Command::Ls { dir } => {
            let (image, path) = PathSpec::parse_image(&dir)?;
            with_fs(&image, |fs| ls(fs, &path, out))
        }
        Command::Put { source, dest } => {
            let (src, dst) = parse_copy_operation(&source, &dest)?;
            let host = expect_host(&src)?;
            let PathSpec::ImagePath { image, path } = dst else {
                bail!("'put' copies from the host into an image");
            };
            let data = fs::read(host).with_context(|| format!("Failed to read {}", host.display()))?;
            with_fs(&image, |fs| put(fs, &path, &data))?;
            writeln!(out, "{} bytes -> {}", data.len(), dest)?;
            Ok(())
        }
        Command::Get { source, dest } => {
            let (src, dst) = parse_copy_operation(&source, &dest)?;
            let host = expect_host(&dst)?;
            let PathSpec::ImagePath { image, path } = src else {
                bail!("'get' copies from an image to the host");
            };
            let data = with_fs(&image, |fs| get(fs, &path))?;
            fs::write(host, &data).with_context(|| format!("Failed to write {}", host.display()))?;
            writeln!(out, "{} bytes -> {}", data.len(), host.display())?;
            Ok(())
        }
        Command::Cat { file } => {
            let (image, path) = PathSpec::parse_image(&file)?;
            let data = with_fs(&image, |fs| get(fs, &path))?;
            out.write_all(&data)?;
            Ok(())
        }
        Command::Rm { path: spec } => {
            let (image, path) = PathSpec::parse_image(&spec)?;
            with_fs(&image, |fs| {
                fs.remove(&path).with_context(|| format!("Failed to remove '{}'", path))
            })
        }
        Command::Mkdir { path: spec } => {
            let (image, path) = PathSpec::parse_image(&spec)?;
            with_fs(&image, |fs| {
                fs.mkdir(&path)
                    .with_context(|| format!("Failed to create directory '{}'", path))
            })
        }
        Command::Mv { from, to } => {
            let (image, old) = PathSpec::parse_image(&from)?;
            let new = match PathSpec::parse(&to) {
                PathSpec::ImagePath { image: other, path } if other == image => path,
                PathSpec::ImagePath { .. } => bail!("'mv' cannot move entries between images"),
                PathSpec::HostPath(path) => path.to_string_lossy().into_owned(),
            };
            with_fs(&image, |fs| {
                fs.rename(&old, &new)
                    .with_context(|| format!("Failed to move '{}' to '{}'", old, new))
            })
        }
        Command::Df { image } => {
            let geometry = geom::load(&image)?;
            let used = with_fs(&image, |fs| Ok(fs.fs_size()?))?;
            let total = geometry.block_count as usize;
            writeln!(
                out,
                "{} of {} blocks used ({} of {} bytes), block size {}",
                used,
                total,
                used * geometry.block_size as usize,
                geometry.capacity(),
                geometry.block_size
            )?;
            Ok(())
        }
    }
}

/// Create and format an image.
fn format(image: &Path, geometry: Geometry, out: &mut dyn Write) -> Result<()> {
    let flash = FileFlash::create(image, geometry)
        .with_context(|| format!("Failed to create image {}", image.display()))?;
    let cfg = flash.into_config(geometry);
    let mut fs = Filesystem::new(SimEngine::new(), &cfg);
    fs.format()
        .with_context(|| format!("Failed to format with geometry {}", geometry))?;
    geom::save(image, &geometry)?;
    log::info!("formatted {} ({})", image.display(), geometry);
    writeln!(out, "formatted {}: {}", image.display(), geometry)?;
    Ok(())
}

/// Mount `image`, run `f` against it, then unmount.
fn with_fs<T>(image: &Path, f: impl FnOnce(&mut Session<'_>) -> Result<T>) -> Result<T> {
    let geometry = geom::load(image)?;
    let flash = FileFlash::open(image, geometry.block_size)
        .with_context(|| format!("Failed to open image {}", image.display()))?;
    if flash.block_count() < geometry.block_count {
        bail!(
            "Image {} holds {} blocks but its geometry says {}",
            image.display(),
            flash.block_count(),
            geometry.block_count
        );
    }
    let cfg = flash.into_config(geometry);
    let mut fs = Filesystem::new(SimEngine::new(), &cfg);
    fs.mount()
        .with_context(|| format!("Failed to mount {}", image.display()))?;

    let result = f(&mut fs);
    if let Err(e) = fs.unmount() {
        log::warn!("unmount failed: {}", e);
    }
    result
}

fn ls(fs: &mut Session<'_>, path: &str, out: &mut dyn Write) -> Result<()> {
    let dd = fs
        .dir_open(path)
        .with_context(|| format!("Failed to open directory '{}'", path))?;
    let result = (|| -> Result<()> {
        loop {
            let entry = match fs.dir_read(dd) {
                Ok(entry) => entry,
                Err(Error::NoEnt) => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            if entry.name == "." || entry.name == ".." {
                continue;
            }
            match entry.kind {
                EntryType::Dir => writeln!(out, "d {:>10} {}/", "-", entry.name)?,
                EntryType::File => writeln!(out, "- {:>10} {}", entry.size, entry.name)?,
            }
        }
    })();
    fs.dir_close(dd)?;
    result
}

fn put(fs: &mut Session<'_>, path: &str, data: &[u8]) -> Result<()> {
    let fd = fs
        .open(path, OpenFlags::WRONLY | OpenFlags::CREAT | OpenFlags::TRUNC)
        .with_context(|| format!("Failed to open '{}' for writing", path))?;
    let mut written = 0;
    let result = (|| -> Result<()> {
        for chunk in data.chunks(CHUNK) {
            let n = fs.write(fd, chunk)?;
            written += n;
            if n < chunk.len() {
                bail!(Error::NoSpc);
            }
        }
        Ok(())
    })();
    fs.close(fd)
        .with_context(|| format!("Failed to save '{}'", path))?;
    result.with_context(|| format!("Failed to write '{}' after {} bytes", path, written))
}

fn get(fs: &mut Session<'_>, path: &str) -> Result<Vec<u8>> {
    let fd = fs
        .open(path, OpenFlags::RDONLY)
        .with_context(|| format!("Failed to open '{}'", path))?;
    let mut data = Vec::with_capacity(fs.size(fd).unwrap_or(0));
    let mut buf = [0u8; CHUNK];
    let result = loop {
        match fs.read(fd, &mut buf) {
            Ok(0) => break Ok(()),
            Ok(n) => data.extend_from_slice(&buf[..n]),
            Err(e) => break Err(e),
        }
    };
    fs.close(fd)?;
    result.with_context(|| format!("Failed to read '{}'", path))?;
    Ok(data)
}
