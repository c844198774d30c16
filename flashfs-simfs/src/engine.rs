//! The reference engine.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use flashfs::{
    Engine, EngineConfig, EngineMut, EntryInfo, EntryType, Error, Geometry, OpenFlags, Whence,
};

use crate::image;
use crate::path;
use crate::tree::{Node, Tree};

/// Check that an engine can lay an image out on `geometry`.
pub fn validate_geometry(geometry: &Geometry) -> Result<(), i32> {
    let Geometry {
        read_size,
        prog_size,
        block_size,
        block_count,
        cache_size,
        lookahead_size,
        ..
    } = *geometry;

    if read_size == 0 || prog_size == 0 || cache_size == 0 || lookahead_size == 0 {
        return Err(Error::INVAL);
    }
    let valid = block_size >= 128
        && block_count >= 2
        && block_size % read_size == 0
        && block_size % prog_size == 0
        && cache_size % read_size == 0
        && cache_size % prog_size == 0
        && block_size % cache_size == 0
        && lookahead_size % 8 == 0;
    if valid { Ok(()) } else { Err(Error::INVAL) }
}

/// Encoded size of a postcard varint holding `n`.
const fn varint_len(mut n: usize) -> usize {
    let mut len = 1;
    while n >= 0x80 {
        n >>= 7;
        len += 1;
    }
    len
}

/// Encoded size of a `Node::File` holding `len` bytes.
const fn file_node_len(len: usize) -> usize {
    1 + varint_len(len) + len
}

fn code<T>(result: Result<T, i32>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(code) => code,
    }
}

/// State of a mounted filesystem.
#[derive(Debug)]
struct Mounted {
    tree: Tree,
    encoded_len: usize,
    image_blocks: u32,
}

impl Mounted {
    /// Apply `change` to the tree and commit it, undoing the change if the
    /// commit fails.
    fn transact<C>(
        &mut self,
        cfg: &EngineConfig<C>,
        change: impl FnOnce(&mut Tree) -> Result<(), i32>,
    ) -> Result<(), i32> {
        let before = self.tree.clone();
        change(&mut self.tree)?;

        let payload = postcard::to_allocvec(&self.tree).map_err(|_| Error::NOMEM);
        match payload.and_then(|payload| image::store(cfg, &payload).map(|n| (payload.len(), n))) {
            Ok((len, blocks)) => {
                self.encoded_len = len;
                self.image_blocks = blocks;
                Ok(())
            }
            Err(code) => {
                warn!("commit failed: {}", code);
                self.tree = before;
                Err(code)
            }
        }
    }

    /// Largest size the file at `path` can grow to and still be committed.
    fn max_file_len(&self, geometry: &Geometry, path: &str) -> usize {
        let others = match self.tree.get(path) {
            Some(Node::File(data)) => self.encoded_len - file_node_len(data.len()),
            // Key, plus one byte in case the map length varint grows.
            _ => self.encoded_len + varint_len(path.len()) + path.len() + 1,
        };
        let room = image::payload_capacity(geometry).saturating_sub(others);
        room.saturating_sub(1 + varint_len(room))
    }
}

/// An open file.
#[derive(Debug)]
struct OpenFile {
    path: String,
    flags: OpenFlags,
    pos: usize,
    data: Vec<u8>,
    dirty: bool,
}

impl OpenFile {
    fn commit<C>(&mut self, cfg: &EngineConfig<C>, mounted: &mut Mounted) -> Result<(), i32> {
        if !self.dirty {
            return Ok(());
        }
        let path = &self.path;
        let data = &self.data;
        mounted.transact(cfg, |tree| {
            match tree.get(path) {
                Some(Node::Dir) => return Err(Error::ISDIR),
                Some(Node::File(_)) => {}
                None => tree.check_parent(path)?,
            }
            tree.insert(path.clone(), Node::File(data.clone()));
            Ok(())
        })?;
        self.dirty = false;
        debug!("committed {} ({} bytes)", path.as_str(), data.len());
        Ok(())
    }
}

/// File cursor of a [`SimEngine`].
///
/// Writes are buffered in the cursor until it is synced or closed.
#[derive(Debug, Default)]
pub struct SimFile(Option<OpenFile>);

/// An open directory.
#[derive(Debug)]
struct OpenDir {
    entries: Vec<EntryInfo>,
    pos: usize,
}

/// Directory cursor of a [`SimEngine`].
///
/// The listing is taken when the directory is opened.
#[derive(Debug, Default)]
pub struct SimDir(Option<OpenDir>);

/// A small image-based engine honouring the engine contract.
///
/// The whole tree lives in memory while mounted. Every committed change is
/// serialised with `postcard` and written through the configuration's block
/// callbacks as a single checksummed image, so a later `mount` over the
/// same media sees it again.
///
/// ```
/// use flashfs::{Filesystem, Geometry, OpenFlags};
/// use flashfs_devices::RamFlash;
/// use flashfs_simfs::SimEngine;
///
/// let geometry = Geometry::new(16, 16, 256, 4, 500, 16, 8);
/// let cfg = RamFlash::new(geometry).into_config(geometry);
/// let mut fs = Filesystem::new(SimEngine::new(), &cfg);
///
/// fs.format().unwrap();
/// fs.mount().unwrap();
/// let fd = fs.open("hello.txt", OpenFlags::CREAT | OpenFlags::WRONLY).unwrap();
/// assert_eq!(fs.write(fd, b"hello").unwrap(), 5);
/// fs.close(fd).unwrap();
/// ```
pub struct SimEngine<C> {
    mounted: Option<Mounted>,
    _context: PhantomData<fn(&C)>,
}

impl<C> SimEngine<C> {
    /// Create an unmounted engine.
    pub const fn new() -> Self {
        Self {
            mounted: None,
            _context: PhantomData,
        }
    }

    /// Whether the engine holds a mounted tree.
    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    /// Number of entries in the mounted tree, the root excluded.
    pub fn entry_count(&self) -> Option<usize> {
        self.mounted.as_ref().map(|m| m.tree.len())
    }

    fn mounted(&mut self) -> Result<&mut Mounted, i32> {
        self.mounted.as_mut().ok_or_else(|| {
            debug!("engine not mounted");
            Error::INVAL
        })
    }

    fn open_file(
        &mut self,
        cfg: &EngineConfig<C>,
        path: &str,
        flags: OpenFlags,
    ) -> Result<OpenFile, i32> {
        let mounted = self.mounted()?;
        if !flags.is_readable() && !flags.is_writable() {
            return Err(Error::INVAL);
        }
        let path = path::normalize(path)?;

        let data = match mounted.tree.get(&path) {
            Some(Node::Dir) => return Err(Error::ISDIR),
            Some(Node::File(_)) if flags.contains(OpenFlags::CREAT | OpenFlags::EXCL) => {
                return Err(Error::EXIST);
            }
            Some(Node::File(data)) => data.clone(),
            None => {
                mounted.tree.check_parent(&path)?;
                if !flags.contains(OpenFlags::CREAT) {
                    return Err(Error::NOENT);
                }
                let created = path.clone();
                mounted.transact(cfg, |tree| {
                    tree.insert(created, Node::File(Vec::new()));
                    Ok(())
                })?;
                debug!("created {}", path.as_str());
                Vec::new()
            }
        };

        let mut file = OpenFile {
            path,
            flags,
            pos: 0,
            data,
            dirty: false,
        };
        if flags.contains(OpenFlags::TRUNC) && !file.data.is_empty() {
            if !flags.is_writable() {
                return Err(Error::INVAL);
            }
            file.data.clear();
            file.dirty = true;
        }
        Ok(file)
    }

    fn open_dir(&mut self, path: &str) -> Result<OpenDir, i32> {
        let mounted = self.mounted()?;
        let path = path::normalize(path)?;
        match mounted.tree.get(&path) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => return Err(Error::NOTDIR),
            None => return Err(Error::NOENT),
        }

        let mut entries = Vec::new();
        for name in [".", ".."] {
            entries.push(EntryInfo {
                kind: EntryType::Dir as u8,
                size: 0,
                name: String::from(name),
            });
        }
        entries.extend(mounted.tree.children(&path));
        Ok(OpenDir { entries, pos: 0 })
    }

    fn seek_file(&mut self, file: &mut SimFile, off: i32, whence: i32) -> Result<usize, i32> {
        self.mounted()?;
        let file = file.0.as_mut().ok_or(Error::BADF)?;
        let base = match Whence::from_raw(whence) {
            Some(Whence::Set) => 0,
            Some(Whence::Cur) => file.pos as i64,
            Some(Whence::End) => file.data.len() as i64,
            None => return Err(Error::INVAL),
        };
        let pos = base + off as i64;
        if pos < 0 || pos > i32::MAX as i64 {
            return Err(Error::INVAL);
        }
        file.pos = pos as usize;
        Ok(file.pos)
    }

    fn write_file(
        &mut self,
        cfg: &EngineConfig<C>,
        file: &mut SimFile,
        buf: &[u8],
    ) -> Result<usize, i32> {
        let mounted = self.mounted()?;
        let file = file.0.as_mut().ok_or(Error::BADF)?;
        if !file.flags.is_writable() {
            return Err(Error::BADF);
        }
        if file.flags.contains(OpenFlags::APPEND) {
            file.pos = file.data.len();
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let max = mounted.max_file_len(cfg.geometry(), &file.path);
        let end = (file.pos + buf.len()).min(max);
        if end > i32::MAX as usize {
            return Err(Error::FBIG);
        }
        if end <= file.pos {
            debug!("no space left for {}", file.path.as_str());
            return Err(Error::NOSPC);
        }

        if file.data.len() < end {
            file.data.resize(end, 0);
        }
        let n = end - file.pos;
        file.data[file.pos..end].copy_from_slice(&buf[..n]);
        file.pos = end;
        file.dirty = true;
        Ok(n)
    }

    fn rename_entry(
        &mut self,
        cfg: &EngineConfig<C>,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), i32> {
        let mounted = self.mounted()?;
        let from = path::normalize(old_path)?;
        let to = path::normalize(new_path)?;
        if from.is_empty() || to.is_empty() {
            return Err(Error::INVAL);
        }

        let tree = &mounted.tree;
        if tree.get(&from).is_none() {
            return Err(Error::NOENT);
        }
        let source_is_dir = tree.is_dir(&from);
        tree.check_parent(&to)?;
        if from == to {
            return Ok(());
        }
        if path::is_below(&to, &from) {
            return Err(Error::INVAL);
        }
        match (source_is_dir, tree.get(&to)) {
            (_, None) => {}
            (false, Some(Node::Dir)) => return Err(Error::ISDIR),
            (true, Some(Node::File(_))) => return Err(Error::NOTDIR),
            (true, Some(Node::Dir)) if tree.has_children(&to) => return Err(Error::NOTEMPTY),
            _ => {}
        }

        mounted.transact(cfg, |tree| {
            tree.remove(&to);
            tree.move_subtree(&from, &to);
            Ok(())
        })?;
        debug!("renamed {} to {}", from.as_str(), to.as_str());
        Ok(())
    }

    fn remove_entry(&mut self, cfg: &EngineConfig<C>, path: &str) -> Result<(), i32> {
        let mounted = self.mounted()?;
        let path = path::normalize(path)?;
        if path.is_empty() {
            return Err(Error::INVAL);
        }
        match mounted.tree.get(&path) {
            None => return Err(Error::NOENT),
            Some(Node::Dir) if mounted.tree.has_children(&path) => return Err(Error::NOTEMPTY),
            Some(_) => {}
        }
        mounted.transact(cfg, |tree| {
            tree.remove(&path);
            Ok(())
        })?;
        debug!("removed {}", path.as_str());
        Ok(())
    }

    fn make_dir(&mut self, cfg: &EngineConfig<C>, path: &str) -> Result<(), i32> {
        let mounted = self.mounted()?;
        let path = path::normalize(path)?;
        if mounted.tree.get(&path).is_some() {
            return Err(Error::EXIST);
        }
        mounted.tree.check_parent(&path)?;
        mounted.transact(cfg, |tree| {
            tree.insert(path.clone(), Node::Dir);
            Ok(())
        })?;
        debug!("created directory {}", path.as_str());
        Ok(())
    }

    fn format_media(&mut self, cfg: &EngineConfig<C>) -> Result<(), i32> {
        if self.mounted.is_some() {
            debug!("refusing to format a mounted filesystem");
            return Err(Error::INVAL);
        }
        validate_geometry(cfg.geometry())?;
        let payload = postcard::to_allocvec(&Tree::default()).map_err(|_| Error::NOMEM)?;
        image::store(cfg, &payload)?;
        Ok(())
    }

    fn mount_media(&mut self, cfg: &EngineConfig<C>) -> Result<(), i32> {
        if self.mounted.is_some() {
            return Err(Error::INVAL);
        }
        validate_geometry(cfg.geometry())?;
        let payload = image::load(cfg)?;
        let tree: Tree = postcard::from_bytes(&payload).map_err(|_| {
            warn!("image payload does not decode");
            Error::CORRUPT
        })?;
        if tree.is_empty() {
            debug!("mounted empty filesystem");
        } else {
            debug!("mounted tree with {} entries", tree.len());
        }
        self.mounted = Some(Mounted {
            tree,
            encoded_len: payload.len(),
            image_blocks: image::blocks_for(cfg.geometry(), payload.len()),
        });
        Ok(())
    }
}

impl<C> Default for SimEngine<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for SimEngine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimEngine")
            .field("mounted", &self.mounted)
            .finish()
    }
}

impl<C> Engine for SimEngine<C> {
    type Context = C;
    type File = SimFile;
    type Dir = SimDir;

    fn mount(&mut self, cfg: &EngineConfig<C>) -> i32 {
        code(self.mount_media(cfg))
    }

    fn unmount(&mut self, _cfg: &EngineConfig<C>) -> i32 {
        match self.mounted.take() {
            Some(_) => 0,
            None => Error::INVAL,
        }
    }

    fn file_open(
        &mut self,
        cfg: &EngineConfig<C>,
        file: &mut SimFile,
        path: &str,
        flags: OpenFlags,
    ) -> i32 {
        match self.open_file(cfg, path, flags) {
            Ok(open) => {
                file.0 = Some(open);
                0
            }
            Err(code) => code,
        }
    }

    fn file_close(&mut self, cfg: &EngineConfig<C>, file: &mut SimFile) -> i32 {
        let Some(mut open) = file.0.take() else {
            return Error::BADF;
        };
        match self.mounted.as_mut() {
            Some(mounted) => code(open.commit(cfg, mounted)),
            None if open.dirty => Error::INVAL,
            None => 0,
        }
    }

    fn file_sync(&mut self, cfg: &EngineConfig<C>, file: &mut SimFile) -> i32 {
        let Some(mounted) = self.mounted.as_mut() else {
            return Error::INVAL;
        };
        match file.0.as_mut() {
            Some(open) => code(open.commit(cfg, mounted)),
            None => Error::BADF,
        }
    }

    fn file_read(&mut self, _cfg: &EngineConfig<C>, file: &mut SimFile, buf: &mut [u8]) -> i32 {
        if self.mounted.is_none() {
            return Error::INVAL;
        }
        let Some(open) = file.0.as_mut() else {
            return Error::BADF;
        };
        if !open.flags.is_readable() {
            return Error::BADF;
        }
        if open.pos >= open.data.len() {
            return 0;
        }
        let n = buf.len().min(open.data.len() - open.pos).min(i32::MAX as usize);
        buf[..n].copy_from_slice(&open.data[open.pos..open.pos + n]);
        open.pos += n;
        n as i32
    }

    fn file_seek(
        &mut self,
        _cfg: &EngineConfig<C>,
        file: &mut SimFile,
        off: i32,
        whence: i32,
    ) -> i32 {
        match self.seek_file(file, off, whence) {
            Ok(pos) => pos as i32,
            Err(code) => code,
        }
    }

    fn file_tell(&mut self, cfg: &EngineConfig<C>, file: &mut SimFile) -> i32 {
        self.file_seek(cfg, file, 0, Whence::Cur as i32)
    }

    fn file_rewind(&mut self, cfg: &EngineConfig<C>, file: &mut SimFile) -> i32 {
        let rc = self.file_seek(cfg, file, 0, Whence::Set as i32);
        if rc < 0 { rc } else { 0 }
    }

    fn file_size(&mut self, _cfg: &EngineConfig<C>, file: &mut SimFile) -> i32 {
        if self.mounted.is_none() {
            return Error::INVAL;
        }
        match file.0.as_ref() {
            Some(open) => open.data.len() as i32,
            None => Error::BADF,
        }
    }

    fn dir_open(&mut self, _cfg: &EngineConfig<C>, dir: &mut SimDir, path: &str) -> i32 {
        match self.open_dir(path) {
            Ok(open) => {
                dir.0 = Some(open);
                0
            }
            Err(code) => code,
        }
    }

    fn dir_close(&mut self, _cfg: &EngineConfig<C>, dir: &mut SimDir) -> i32 {
        match dir.0.take() {
            Some(_) => 0,
            None => Error::BADF,
        }
    }

    fn dir_read(&mut self, _cfg: &EngineConfig<C>, dir: &mut SimDir, info: &mut EntryInfo) -> i32 {
        if self.mounted.is_none() {
            return Error::INVAL;
        }
        let Some(open) = dir.0.as_mut() else {
            return Error::BADF;
        };
        match open.entries.get(open.pos) {
            Some(entry) => {
                info.clone_from(entry);
                open.pos += 1;
                1
            }
            None => 0,
        }
    }

    fn dir_rewind(&mut self, _cfg: &EngineConfig<C>, dir: &mut SimDir) -> i32 {
        if self.mounted.is_none() {
            return Error::INVAL;
        }
        match dir.0.as_mut() {
            Some(open) => {
                open.pos = 0;
                0
            }
            None => Error::BADF,
        }
    }

    fn fs_size(&mut self, _cfg: &EngineConfig<C>) -> i32 {
        match self.mounted.as_ref() {
            Some(mounted) => mounted.image_blocks as i32,
            None => Error::INVAL,
        }
    }
}

impl<C> EngineMut for SimEngine<C> {
    fn format(&mut self, cfg: &EngineConfig<C>) -> i32 {
        code(self.format_media(cfg))
    }

    fn remove(&mut self, cfg: &EngineConfig<C>, path: &str) -> i32 {
        code(self.remove_entry(cfg, path))
    }

    fn rename(&mut self, cfg: &EngineConfig<C>, old_path: &str, new_path: &str) -> i32 {
        code(self.rename_entry(cfg, old_path, new_path))
    }

    fn mkdir(&mut self, cfg: &EngineConfig<C>, path: &str) -> i32 {
        code(self.make_dir(cfg, path))
    }

    fn file_write(&mut self, cfg: &EngineConfig<C>, file: &mut SimFile, buf: &[u8]) -> i32 {
        match self.write_file(cfg, file, buf) {
            Ok(n) => n as i32,
            Err(code) => code,
        }
    }

    fn file_truncate(&mut self, cfg: &EngineConfig<C>, file: &mut SimFile, size: u32) -> i32 {
        let Some(mounted) = self.mounted.as_mut() else {
            return Error::INVAL;
        };
        let Some(open) = file.0.as_mut() else {
            return Error::BADF;
        };
        if !open.flags.is_writable() {
            return Error::BADF;
        }
        let size = size as usize;
        if size > i32::MAX as usize {
            return Error::FBIG;
        }
        if size > open.data.len() && size > mounted.max_file_len(cfg.geometry(), &open.path) {
            return Error::NOSPC;
        }
        open.data.resize(size, 0);
        open.dirty = true;
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashfs_devices::RamFlash;

    fn geometry() -> Geometry {
        Geometry::new(16, 16, 256, 4, 500, 16, 8)
    }

    fn formatted() -> (Sim, EngineConfig<RamFlash>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let cfg = RamFlash::new(geometry()).into_config(geometry());
        let mut engine = SimEngine::new();
        assert_eq!(engine.format(&cfg), 0);
        assert_eq!(engine.mount(&cfg), 0);
        (engine, cfg)
    }

    type Sim = SimEngine<RamFlash>;

    fn open(engine: &mut Sim, cfg: &EngineConfig<RamFlash>, path: &str, flags: OpenFlags) -> SimFile {
        let mut file = SimFile::default();
        assert_eq!(engine.file_open(cfg, &mut file, path, flags), 0);
        file
    }

    fn list(engine: &mut Sim, cfg: &EngineConfig<RamFlash>, path: &str) -> Vec<String> {
        let mut dir = SimDir::default();
        assert_eq!(engine.dir_open(cfg, &mut dir, path), 0);
        let mut names = Vec::new();
        let mut info = EntryInfo::default();
        while engine.dir_read(cfg, &mut dir, &mut info) > 0 {
            names.push(info.name.clone());
        }
        assert_eq!(engine.dir_close(cfg, &mut dir), 0);
        names
    }

    #[test]
    fn test_geometry_validation() {
        assert_eq!(validate_geometry(&geometry()), Ok(()));
        let bad = [
            Geometry::new(0, 16, 256, 4, 500, 16, 8),
            Geometry::new(16, 16, 64, 4, 500, 16, 8),
            Geometry::new(16, 16, 256, 1, 500, 16, 8),
            Geometry::new(16, 48, 256, 4, 500, 48, 8),
            Geometry::new(16, 16, 256, 4, 500, 24, 8),
            Geometry::new(16, 16, 256, 4, 500, 16, 12),
        ];
        for geometry in bad {
            assert_eq!(validate_geometry(&geometry), Err(Error::INVAL), "{}", geometry);
        }
    }

    #[test]
    fn test_format_rejects_bad_geometry() {
        let geometry = Geometry::new(16, 16, 256, 4, 500, 16, 7);
        let cfg = RamFlash::new(geometry).into_config(geometry);
        let mut engine = SimEngine::new();
        assert_eq!(engine.format(&cfg), Error::INVAL);
        assert_eq!(engine.mount(&cfg), Error::INVAL);
    }

    #[test]
    fn test_mount_blank_media_is_corrupt() {
        let cfg = RamFlash::new(geometry()).into_config(geometry());
        let mut engine = SimEngine::new();
        assert_eq!(engine.mount(&cfg), Error::CORRUPT);
        assert!(!engine.is_mounted());
    }

    #[test]
    fn test_unmounted_operations() {
        let cfg = RamFlash::new(geometry()).into_config(geometry());
        let mut engine = SimEngine::new();
        let mut file = SimFile::default();
        assert_eq!(engine.file_open(&cfg, &mut file, "a", OpenFlags::RDONLY), Error::INVAL);
        assert_eq!(engine.mkdir(&cfg, "d"), Error::INVAL);
        assert_eq!(engine.fs_size(&cfg), Error::INVAL);
        assert_eq!(engine.unmount(&cfg), Error::INVAL);
    }

    #[test]
    fn test_writes_are_buffered_until_sync() {
        let (mut engine, cfg) = formatted();
        let mut file = open(&mut engine, &cfg, "log.txt", OpenFlags::CREAT | OpenFlags::RDWR);
        assert_eq!(engine.file_write(&cfg, &mut file, b"boot ok"), 7);

        let mut reader = open(&mut engine, &cfg, "log.txt", OpenFlags::RDONLY);
        assert_eq!(engine.file_size(&cfg, &mut reader), 0);
        assert_eq!(engine.file_close(&cfg, &mut reader), 0);

        assert_eq!(engine.file_sync(&cfg, &mut file), 0);
        let mut reader = open(&mut engine, &cfg, "log.txt", OpenFlags::RDONLY);
        let mut buf = [0u8; 16];
        assert_eq!(engine.file_read(&cfg, &mut reader, &mut buf), 7);
        assert_eq!(&buf[..7], b"boot ok");
    }

    #[test]
    fn test_seek_past_end_zero_fills() {
        let (mut engine, cfg) = formatted();
        let mut file = open(&mut engine, &cfg, "gap", OpenFlags::CREAT | OpenFlags::RDWR);
        assert_eq!(engine.file_seek(&cfg, &mut file, 4, Whence::Set as i32), 4);
        assert_eq!(engine.file_write(&cfg, &mut file, b"xy"), 2);
        assert_eq!(engine.file_size(&cfg, &mut file), 6);

        assert_eq!(engine.file_rewind(&cfg, &mut file), 0);
        let mut buf = [0xAAu8; 6];
        assert_eq!(engine.file_read(&cfg, &mut file, &mut buf), 6);
        assert_eq!(&buf, b"\0\0\0\0xy");

        assert_eq!(engine.file_seek(&cfg, &mut file, -7, Whence::End as i32), Error::INVAL);
        assert_eq!(engine.file_seek(&cfg, &mut file, 0, 9), Error::INVAL);
        assert_eq!(engine.file_tell(&cfg, &mut file), 6);
    }

    #[test]
    fn test_open_flags() {
        let (mut engine, cfg) = formatted();
        let mut file = open(&mut engine, &cfg, "cfg", OpenFlags::CREAT | OpenFlags::WRONLY);
        assert_eq!(engine.file_write(&cfg, &mut file, b"abc"), 3);
        let mut buf = [0u8; 3];
        assert_eq!(engine.file_read(&cfg, &mut file, &mut buf), Error::BADF);
        assert_eq!(engine.file_close(&cfg, &mut file), 0);

        let mut other = SimFile::default();
        let excl = OpenFlags::CREAT | OpenFlags::EXCL | OpenFlags::WRONLY;
        assert_eq!(engine.file_open(&cfg, &mut other, "cfg", excl), Error::EXIST);
        assert_eq!(engine.file_open(&cfg, &mut other, "none", OpenFlags::RDONLY), Error::NOENT);

        let mut file = open(&mut engine, &cfg, "cfg", OpenFlags::RDONLY);
        assert_eq!(engine.file_write(&cfg, &mut file, b"x"), Error::BADF);
        assert_eq!(engine.file_truncate(&cfg, &mut file, 0), Error::BADF);

        let mut file = open(&mut engine, &cfg, "cfg", OpenFlags::WRONLY | OpenFlags::APPEND);
        assert_eq!(engine.file_write(&cfg, &mut file, b"de"), 2);
        assert_eq!(engine.file_size(&cfg, &mut file), 5);
        assert_eq!(engine.file_close(&cfg, &mut file), 0);

        let mut file = open(&mut engine, &cfg, "cfg", OpenFlags::RDWR | OpenFlags::TRUNC);
        assert_eq!(engine.file_size(&cfg, &mut file), 0);
    }

    #[test]
    fn test_open_errors() {
        let (mut engine, cfg) = formatted();
        assert_eq!(engine.mkdir(&cfg, "etc"), 0);
        let mut file = SimFile::default();
        assert_eq!(engine.file_open(&cfg, &mut file, "etc", OpenFlags::RDONLY), Error::ISDIR);
        assert_eq!(engine.file_open(&cfg, &mut file, "/", OpenFlags::RDONLY), Error::ISDIR);
        let create = OpenFlags::CREAT | OpenFlags::WRONLY;
        assert_eq!(engine.file_open(&cfg, &mut file, "var/log", create), Error::NOENT);

        let long = "n".repeat(path::NAME_MAX + 1);
        assert_eq!(engine.file_open(&cfg, &mut file, &long, create), Error::NAMETOOLONG);

        let mut f = open(&mut engine, &cfg, "etc/hosts", create);
        assert_eq!(engine.file_close(&cfg, &mut f), 0);
        assert_eq!(engine.file_open(&cfg, &mut file, "etc/hosts/x", create), Error::NOTDIR);
    }

    #[test]
    fn test_directory_listing() {
        let (mut engine, cfg) = formatted();
        assert_eq!(engine.mkdir(&cfg, "b"), 0);
        assert_eq!(engine.mkdir(&cfg, "/a/"), 0);
        assert_eq!(engine.mkdir(&cfg, "a/inner"), 0);
        assert_eq!(engine.mkdir(&cfg, "a"), Error::EXIST);

        assert_eq!(list(&mut engine, &cfg, "/"), [".", "..", "a", "b"]);
        assert_eq!(list(&mut engine, &cfg, "a"), [".", "..", "inner"]);

        let mut dir = SimDir::default();
        assert_eq!(engine.dir_open(&cfg, &mut dir, "missing"), Error::NOENT);
    }

    #[test]
    fn test_dir_rewind() {
        let (mut engine, cfg) = formatted();
        let mut dir = SimDir::default();
        assert_eq!(engine.dir_open(&cfg, &mut dir, ""), 0);
        let mut info = EntryInfo::default();
        assert_eq!(engine.dir_read(&cfg, &mut dir, &mut info), 1);
        assert_eq!(engine.dir_read(&cfg, &mut dir, &mut info), 1);
        assert_eq!(engine.dir_read(&cfg, &mut dir, &mut info), 0);
        assert_eq!(engine.dir_read(&cfg, &mut dir, &mut info), 0);
        assert_eq!(engine.dir_rewind(&cfg, &mut dir), 0);
        assert_eq!(engine.dir_read(&cfg, &mut dir, &mut info), 1);
        assert_eq!(info.name, ".");
    }

    #[test]
    fn test_remove_rules() {
        let (mut engine, cfg) = formatted();
        assert_eq!(engine.mkdir(&cfg, "d"), 0);
        let mut f = open(&mut engine, &cfg, "d/f", OpenFlags::CREAT | OpenFlags::WRONLY);
        assert_eq!(engine.file_close(&cfg, &mut f), 0);

        assert_eq!(engine.remove(&cfg, "d"), Error::NOTEMPTY);
        assert_eq!(engine.remove(&cfg, "d/f"), 0);
        assert_eq!(engine.remove(&cfg, "d/f"), Error::NOENT);
        assert_eq!(engine.remove(&cfg, "d"), 0);
        assert_eq!(engine.remove(&cfg, "/"), Error::INVAL);
        assert_eq!(engine.entry_count(), Some(0));
    }

    #[test]
    fn test_rename_rules() {
        let (mut engine, cfg) = formatted();
        assert_eq!(engine.mkdir(&cfg, "src"), 0);
        assert_eq!(engine.mkdir(&cfg, "full"), 0);
        assert_eq!(engine.mkdir(&cfg, "empty"), 0);
        for path in ["src/main", "full/x", "file"] {
            let mut f = open(&mut engine, &cfg, path, OpenFlags::CREAT | OpenFlags::WRONLY);
            assert_eq!(engine.file_close(&cfg, &mut f), 0);
        }

        assert_eq!(engine.rename(&cfg, "nope", "x"), Error::NOENT);
        assert_eq!(engine.rename(&cfg, "file", "empty"), Error::ISDIR);
        assert_eq!(engine.rename(&cfg, "src", "file"), Error::NOTDIR);
        assert_eq!(engine.rename(&cfg, "src", "full"), Error::NOTEMPTY);
        assert_eq!(engine.rename(&cfg, "src", "src/deeper"), Error::INVAL);

        assert_eq!(engine.rename(&cfg, "src", "empty"), 0);
        assert_eq!(list(&mut engine, &cfg, "empty"), [".", "..", "main"]);
        assert_eq!(engine.rename(&cfg, "file", "full/x"), 0);
        assert_eq!(list(&mut engine, &cfg, "/"), [".", "..", "empty", "full"]);
    }

    #[test]
    fn test_no_space() {
        let (mut engine, cfg) = formatted();
        let mut file = open(&mut engine, &cfg, "big", OpenFlags::CREAT | OpenFlags::WRONLY);
        let data = [0x5Au8; 2048];
        let n = engine.file_write(&cfg, &mut file, &data);
        assert!(n > 0 && (n as usize) < 1024, "wrote {}", n);
        assert_eq!(engine.file_write(&cfg, &mut file, b"more"), Error::NOSPC);
        assert_eq!(engine.file_close(&cfg, &mut file), 0);
        assert_eq!(engine.fs_size(&cfg), 4);
    }

    #[test]
    fn test_failed_commit_rolls_back() {
        let (mut engine, cfg) = formatted();
        cfg.context().set_write_protected(true);
        assert_eq!(engine.mkdir(&cfg, "d"), Error::IO);
        assert_eq!(engine.entry_count(), Some(0));
        cfg.context().set_write_protected(false);
        assert_eq!(engine.mkdir(&cfg, "d"), 0);
    }

    #[test]
    fn test_persists_across_mounts() {
        let (mut engine, cfg) = formatted();
        assert_eq!(engine.mkdir(&cfg, "keep"), 0);
        let mut f = open(&mut engine, &cfg, "keep/me", OpenFlags::CREAT | OpenFlags::WRONLY);
        assert_eq!(engine.file_write(&cfg, &mut f, b"persisted"), 9);
        assert_eq!(engine.file_close(&cfg, &mut f), 0);
        assert_eq!(engine.unmount(&cfg), 0);

        let mut engine = SimEngine::new();
        assert_eq!(engine.mount(&cfg), 0);
        assert_eq!(engine.mount(&cfg), Error::INVAL);
        assert_eq!(engine.fs_size(&cfg), 1);
        let mut f = open(&mut engine, &cfg, "keep/me", OpenFlags::RDONLY);
        assert_eq!(engine.file_size(&cfg, &mut f), 9);
    }
}
