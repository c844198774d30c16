//! Type-safe descriptor handles.

use core::fmt;

/// Handle of an open file.
///
/// Handles are scoped to one [`Filesystem`](crate::Filesystem) and are never
/// reused within it. The numeric value carries no relation to the file's path.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileHandle(usize);

/// Handle of an open directory.
///
/// Directory handles are counted independently from file handles.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirHandle(usize);

impl FileHandle {
    /// Create a file handle from its raw value.
    ///
    /// # Examples
    ///
    /// ```
    /// use flashfs::FileHandle;
    ///
    /// let fd = FileHandle::new(3);
    /// assert_eq!(fd.value(), 3);
    /// ```
    #[inline]
    pub const fn new(value: usize) -> Self {
        Self(value)
    }

    /// Get the underlying value.
    #[inline]
    pub const fn value(self) -> usize {
        self.0
    }
}

impl DirHandle {
    /// Create a directory handle from its raw value.
    #[inline]
    pub const fn new(value: usize) -> Self {
        Self(value)
    }

    /// Get the underlying value.
    #[inline]
    pub const fn value(self) -> usize {
        self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File({})", self.0)
    }
}

impl fmt::Display for DirHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dir({})", self.0)
    }
}

impl From<FileHandle> for usize {
    fn from(fd: FileHandle) -> Self {
        fd.value()
    }
}

impl From<DirHandle> for usize {
    fn from(dd: DirHandle) -> Self {
        dd.value()
    }
}

/// Monotonic handle counter.
///
/// Hands out `0, 1, 2, ...` and never goes back.
#[derive(Debug, Default)]
pub(crate) struct Counter(usize);

impl Counter {
    /// The value the next [`Counter::advance`] returns.
    #[inline]
    pub(crate) const fn peek(&self) -> usize {
        self.0
    }

    /// Return the current value and move past it.
    #[inline]
    pub(crate) fn advance(&mut self) -> usize {
        let value = self.0;
        self.0 += 1;
        value
    }
}
