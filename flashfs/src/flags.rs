//! Open flags, seek origins and entry types.

use bitflags::bitflags;

bitflags! {
    /// Flags for [`Filesystem::open`](crate::Filesystem::open).
    ///
    /// The access mode is one of `RDONLY`, `WRONLY` or `RDWR`; the remaining
    /// flags are combined with `|`.
    ///
    /// ```
    /// use flashfs::OpenFlags;
    ///
    /// let flags = OpenFlags::CREAT | OpenFlags::WRONLY;
    /// assert!(flags.is_writable());
    /// assert!(!flags.is_readable());
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        /// Open a file as read only.
        const RDONLY = 0x0001;
        /// Open a file as write only.
        const WRONLY = 0x0002;
        /// Open a file as read and write.
        const RDWR = Self::RDONLY.bits() | Self::WRONLY.bits();
        /// Create the file if it does not exist.
        const CREAT = 0x0100;
        /// Fail if the file already exists.
        const EXCL = 0x0200;
        /// Truncate an existing file to zero size.
        const TRUNC = 0x0400;
        /// Move to the end of the file on every write.
        const APPEND = 0x0800;
    }
}

impl OpenFlags {
    /// Whether the access mode allows reading.
    #[inline]
    pub const fn is_readable(&self) -> bool {
        self.contains(Self::RDONLY)
    }

    /// Whether the access mode allows writing.
    #[inline]
    pub const fn is_writable(&self) -> bool {
        self.contains(Self::WRONLY)
    }

    /// Whether any flag requires a write-capable engine.
    #[inline]
    pub const fn has_write_intent(&self) -> bool {
        self.intersects(
            Self::WRONLY
                .union(Self::CREAT)
                .union(Self::EXCL)
                .union(Self::TRUNC)
                .union(Self::APPEND),
        )
    }
}

/// Origin of a [`Filesystem::seek`](crate::Filesystem::seek).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Whence {
    /// Seek relative to the start of the file.
    Set = 0,
    /// Seek relative to the current position.
    Cur = 1,
    /// Seek relative to the end of the file.
    End = 2,
}

impl Whence {
    /// Decode the engine's raw whence value.
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Set),
            1 => Some(Self::Cur),
            2 => Some(Self::End),
            _ => None,
        }
    }
}

/// Kind of a directory entry.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryType {
    /// A regular file.
    File = 0x001,
    /// A directory.
    Dir = 0x002,
}

impl EntryType {
    /// Decode the engine's raw type byte.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x001 => Some(Self::File),
            0x002 => Some(Self::Dir),
            _ => None,
        }
    }

    /// Check if this is a regular file.
    #[inline]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Check if this is a directory.
    #[inline]
    pub const fn is_dir(&self) -> bool {
        matches!(self, Self::Dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_flag_values() {
        assert_eq!(OpenFlags::RDONLY.bits(), 1);
        assert_eq!(OpenFlags::WRONLY.bits(), 2);
        assert_eq!(OpenFlags::RDWR.bits(), 3);
        assert_eq!((OpenFlags::CREAT | OpenFlags::EXCL).bits(), 0x0300);
    }

    #[test]
    fn test_access_mode_checks() {
        assert!(OpenFlags::RDWR.is_readable());
        assert!(OpenFlags::RDWR.is_writable());
        assert!(!OpenFlags::RDONLY.has_write_intent());
        assert!((OpenFlags::RDONLY | OpenFlags::CREAT).has_write_intent());
        assert!(OpenFlags::APPEND.has_write_intent());
    }

    #[test]
    fn test_whence_raw() {
        assert_eq!(Whence::End as i32, 2);
        assert_eq!(Whence::from_raw(1), Some(Whence::Cur));
        assert_eq!(Whence::from_raw(3), None);
    }

    #[test]
    fn test_entry_type_raw() {
        assert_eq!(EntryType::from_raw(0x002), Some(EntryType::Dir));
        assert_eq!(EntryType::from_raw(0x011), None);
        assert!(EntryType::File.is_file());
        assert!(!EntryType::File.is_dir());
    }
}
