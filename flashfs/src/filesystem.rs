//! The handle-based filesystem session.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::config::EngineConfig;
use crate::engine::{Engine, EngineMut, EntryInfo};
use crate::error::{Error, Result, check, count};
use crate::flags::{EntryType, OpenFlags, Whence};
use crate::handle::{Counter, DirHandle, FileHandle};
use crate::state::MountState;

/// One entry produced by [`Filesystem::dir_read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name without its parent path.
    pub name: String,
    /// Whether the entry is a file or a directory.
    pub kind: EntryType,
    /// Size in bytes for regular files, zero for directories.
    pub size: usize,
}

/// A session over one engine instance.
///
/// The session owns two descriptor tables mapping handles to the engine's
/// cursors. Handles are minted from counters that only ever increase, so a
/// closed handle can never alias a newer one; any operation on a handle that
/// is not in its table fails with [`Error::NoFdEntry`] or [`Error::NoDdEntry`]
/// without reaching the engine.
///
/// Mutating operations are only available when the engine implements
/// [`EngineMut`].
///
/// # Examples
///
/// ```ignore
/// let cfg = RamFlash::new(geometry).into_config(geometry);
/// let mut fs = Filesystem::new(SimEngine::new(), &cfg);
///
/// fs.format()?;
/// fs.mount()?;
/// let fd = fs.open("boot.cfg", OpenFlags::CREAT | OpenFlags::WRONLY)?;
/// fs.write(fd, b"retries=3")?;
/// fs.close(fd)?;
/// ```
pub struct Filesystem<'a, E: Engine> {
    engine: E,
    config: &'a EngineConfig<E::Context>,
    state: MountState,
    next_file: Counter,
    files: BTreeMap<FileHandle, Box<E::File>>,
    next_dir: Counter,
    dirs: BTreeMap<DirHandle, Box<E::Dir>>,
}

fn lookup_file<T>(files: &mut BTreeMap<FileHandle, Box<T>>, fd: FileHandle) -> Result<&mut T> {
    match files.get_mut(&fd) {
        Some(file) => Ok(&mut **file),
        None => {
            debug!("no entry for file handle {}", fd.value());
            Err(Error::NoFdEntry)
        }
    }
}

fn lookup_dir<T>(dirs: &mut BTreeMap<DirHandle, Box<T>>, dd: DirHandle) -> Result<&mut T> {
    match dirs.get_mut(&dd) {
        Some(dir) => Ok(&mut **dir),
        None => {
            debug!("no entry for directory handle {}", dd.value());
            Err(Error::NoDdEntry)
        }
    }
}

impl<'a, E: Engine> Filesystem<'a, E> {
    /// Create an unmounted session.
    pub fn new(engine: E, config: &'a EngineConfig<E::Context>) -> Self {
        Self {
            engine,
            config,
            state: MountState::Unmounted,
            next_file: Counter::default(),
            files: BTreeMap::new(),
            next_dir: Counter::default(),
            dirs: BTreeMap::new(),
        }
    }

    /// The configuration this session was created with.
    #[inline]
    pub fn config(&self) -> &'a EngineConfig<E::Context> {
        self.config
    }

    /// The engine behind this session.
    #[inline]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Check if a filesystem is mounted.
    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.state.is_mounted()
    }

    /// Number of open file handles.
    #[inline]
    pub fn open_files(&self) -> usize {
        self.files.len()
    }

    /// Number of open directory handles.
    #[inline]
    pub fn open_dirs(&self) -> usize {
        self.dirs.len()
    }

    /// Mount the filesystem.
    ///
    /// Fails with [`Error::Inval`] if this session is already mounted.
    /// Unformatted media is reported by the engine, typically as
    /// [`Error::Corrupt`].
    pub fn mount(&mut self) -> Result<()> {
        if self.state.is_mounted() {
            warn!("mount called on a mounted session");
            return Err(Error::Inval);
        }
        check(self.engine.mount(self.config)).inspect_err(|e| {
            debug!("mount failed: {}", e.code());
        })?;
        self.state = MountState::Mounted;
        info!("mounted");
        Ok(())
    }

    /// Unmount the filesystem.
    ///
    /// Open handles are left in place; close them first.
    pub fn unmount(&mut self) -> Result<()> {
        if !self.files.is_empty() || !self.dirs.is_empty() {
            warn!(
                "unmounting with {} file and {} directory handles open",
                self.files.len(),
                self.dirs.len()
            );
        }
        check(self.engine.unmount(self.config))?;
        self.state = MountState::Unmounted;
        info!("unmounted");
        Ok(())
    }

    /// Open the file at `path` and register it under a new handle.
    ///
    /// The handle only becomes visible once the engine has fully initialised
    /// the cursor; on failure no handle is consumed.
    pub fn open(&mut self, path: &str, flags: OpenFlags) -> Result<FileHandle> {
        let mut file = Box::<E::File>::default();
        check(self.engine.file_open(self.config, &mut file, path, flags)).inspect_err(|e| {
            debug!("open {} failed: {}", path, e.code());
        })?;

        let fd = FileHandle::new(self.next_file.advance());
        self.files.insert(fd, file);
        debug!("opened {} as file handle {}", path, fd.value());
        Ok(fd)
    }

    /// Read into `buf`, returning how many bytes were read.
    ///
    /// Fewer bytes than requested are returned at the end of the file.
    pub fn read(&mut self, fd: FileHandle, buf: &mut [u8]) -> Result<usize> {
        let file = lookup_file(&mut self.files, fd)?;
        let n = count(self.engine.file_read(self.config, file, buf))?;
        trace!("read {} of {} bytes from {}", n, buf.len(), fd.value());
        Ok(n)
    }

    /// Current position of the file.
    pub fn tell(&mut self, fd: FileHandle) -> Result<usize> {
        let file = lookup_file(&mut self.files, fd)?;
        count(self.engine.file_tell(self.config, file))
    }

    /// Size of the file in bytes, including data not yet synced.
    pub fn size(&mut self, fd: FileHandle) -> Result<usize> {
        let file = lookup_file(&mut self.files, fd)?;
        count(self.engine.file_size(self.config, file))
    }

    /// Move the file position, returning the new position.
    pub fn seek(&mut self, fd: FileHandle, offset: i32, whence: Whence) -> Result<usize> {
        let file = lookup_file(&mut self.files, fd)?;
        count(self.engine.file_seek(self.config, file, offset, whence as i32))
    }

    /// Move the file position back to the start.
    pub fn rewind(&mut self, fd: FileHandle) -> Result<()> {
        let file = lookup_file(&mut self.files, fd)?;
        check(self.engine.file_rewind(self.config, file))
    }

    /// Write back any data buffered for the file.
    pub fn sync(&mut self, fd: FileHandle) -> Result<()> {
        let file = lookup_file(&mut self.files, fd)?;
        check(self.engine.file_sync(self.config, file))
    }

    /// Close the file and release its handle.
    ///
    /// The handle is released before the engine is asked to close the cursor,
    /// so it is gone even when the engine reports an error.
    pub fn close(&mut self, fd: FileHandle) -> Result<()> {
        let Some(mut file) = self.files.remove(&fd) else {
            debug!("no entry for file handle {}", fd.value());
            return Err(Error::NoFdEntry);
        };
        debug!("closing file handle {}", fd.value());
        check(self.engine.file_close(self.config, &mut file)).inspect_err(|e| {
            warn!("closing file handle {} failed: {}", fd.value(), e.code());
        })
    }

    /// Open the directory at `path` and register it under a new handle.
    pub fn dir_open(&mut self, path: &str) -> Result<DirHandle> {
        let mut dir = Box::<E::Dir>::default();
        check(self.engine.dir_open(self.config, &mut dir, path)).inspect_err(|e| {
            debug!("dir_open {} failed: {}", path, e.code());
        })?;

        let dd = DirHandle::new(self.next_dir.advance());
        self.dirs.insert(dd, dir);
        debug!("opened {} as directory handle {}", path, dd.value());
        Ok(dd)
    }

    /// Read the next directory entry.
    ///
    /// Once every entry has been produced this returns [`Error::NoEnt`], and
    /// keeps doing so until [`Filesystem::dir_rewind`].
    pub fn dir_read(&mut self, dd: DirHandle) -> Result<DirEntry> {
        let dir = lookup_dir(&mut self.dirs, dd)?;
        let mut info = EntryInfo::default();
        let rc = self.engine.dir_read(self.config, dir, &mut info);
        if rc == 0 {
            return Err(Error::NoEnt);
        }
        check(rc)?;

        let Some(kind) = EntryType::from_raw(info.kind) else {
            warn!("entry {} has unknown type {}", info.name.as_str(), info.kind);
            return Err(Error::Corrupt);
        };
        let size = if kind.is_file() { info.size as usize } else { 0 };
        Ok(DirEntry {
            name: info.name,
            kind,
            size,
        })
    }

    /// Restart iteration from the first entry.
    pub fn dir_rewind(&mut self, dd: DirHandle) -> Result<()> {
        let dir = lookup_dir(&mut self.dirs, dd)?;
        check(self.engine.dir_rewind(self.config, dir))
    }

    /// Close the directory and release its handle.
    ///
    /// Like [`Filesystem::close`], the handle is released first.
    pub fn dir_close(&mut self, dd: DirHandle) -> Result<()> {
        let Some(mut dir) = self.dirs.remove(&dd) else {
            debug!("no entry for directory handle {}", dd.value());
            return Err(Error::NoDdEntry);
        };
        debug!("closing directory handle {}", dd.value());
        check(self.engine.dir_close(self.config, &mut dir)).inspect_err(|e| {
            warn!("closing directory handle {} failed: {}", dd.value(), e.code());
        })
    }

    /// Number of blocks currently allocated by the filesystem.
    pub fn fs_size(&mut self) -> Result<usize> {
        count(self.engine.fs_size(self.config))
    }
}

impl<E: EngineMut> Filesystem<'_, E> {
    /// Write an empty filesystem to the media.
    pub fn format(&mut self) -> Result<()> {
        check(self.engine.format(self.config)).inspect_err(|e| {
            warn!("format failed: {}", e.code());
        })?;
        info!("formatted {} blocks", self.config.geometry().block_count);
        Ok(())
    }

    /// Remove a file or an empty directory.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        check(self.engine.remove(self.config, path))?;
        debug!("removed {}", path);
        Ok(())
    }

    /// Rename or move an entry.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<()> {
        check(self.engine.rename(self.config, old_path, new_path))?;
        debug!("renamed {} to {}", old_path, new_path);
        Ok(())
    }

    /// Create a directory.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        check(self.engine.mkdir(self.config, path))?;
        debug!("created directory {}", path);
        Ok(())
    }

    /// Write `buf`, returning how many bytes were written.
    ///
    /// The engine may accept fewer bytes than offered, for example when the
    /// media is nearly full.
    pub fn write(&mut self, fd: FileHandle, buf: &[u8]) -> Result<usize> {
        let file = lookup_file(&mut self.files, fd)?;
        let n = count(self.engine.file_write(self.config, file, buf))?;
        trace!("wrote {} of {} bytes to {}", n, buf.len(), fd.value());
        Ok(n)
    }

    /// Shrink or extend the file to `size` bytes.
    pub fn truncate(&mut self, fd: FileHandle, size: u32) -> Result<()> {
        let file = lookup_file(&mut self.files, fd)?;
        check(self.engine.file_truncate(self.config, file, size))
    }
}

impl<E: Engine + core::fmt::Debug> core::fmt::Debug for Filesystem<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Filesystem")
            .field("engine", &self.engine)
            .field("state", &self.state)
            .field("next_file", &self.next_file.peek())
            .field("open_files", &self.files.len())
            .field("next_dir", &self.next_dir.peek())
            .field("open_dirs", &self.dirs.len())
            .finish()
    }
}
