//! Error codes shared by the adapter and the engines behind it.
//!
//! Engines report failures as negative integers. [`Error`] mirrors those codes
//! one-to-one and adds the two codes the adapter raises on its own when a
//! handle lookup misses.

use core::fmt;

/// Result type returned by every [`Filesystem`](crate::Filesystem) operation.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors reported by the filesystem adapter.
///
/// All variants except [`Error::NoFdEntry`], [`Error::NoDdEntry`] and
/// [`Error::Unknown`] carry the engine's own error code. `NoEnt` is also
/// returned by [`Filesystem::dir_read`](crate::Filesystem::dir_read) once a
/// directory has no more entries.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Error {
    /// Error during device operation.
    Io,
    /// Corrupted metadata, or media that was never formatted.
    Corrupt,
    /// No directory entry.
    NoEnt,
    /// Entry already exists.
    Exist,
    /// Entry is not a directory.
    NotDir,
    /// Entry is a directory.
    IsDir,
    /// Directory is not empty.
    NotEmpty,
    /// Bad file number.
    BadF,
    /// File too large.
    FBig,
    /// Invalid parameter.
    Inval,
    /// No space left on device.
    NoSpc,
    /// No more memory available.
    NoMem,
    /// No attribute available.
    NoAttr,
    /// File name too long.
    NameTooLong,
    /// No open file is registered under the given handle.
    NoFdEntry,
    /// No open directory is registered under the given handle.
    NoDdEntry,
    /// A negative engine code outside the known set.
    Unknown(i32),
}

impl Error {
    /// Engine code for [`Error::Io`].
    pub const IO: i32 = -5;
    /// Engine code for [`Error::Corrupt`].
    pub const CORRUPT: i32 = -84;
    /// Engine code for [`Error::NoEnt`].
    pub const NOENT: i32 = -2;
    /// Engine code for [`Error::Exist`].
    pub const EXIST: i32 = -17;
    /// Engine code for [`Error::NotDir`].
    pub const NOTDIR: i32 = -20;
    /// Engine code for [`Error::IsDir`].
    pub const ISDIR: i32 = -21;
    /// Engine code for [`Error::NotEmpty`].
    pub const NOTEMPTY: i32 = -39;
    /// Engine code for [`Error::BadF`].
    pub const BADF: i32 = -9;
    /// Engine code for [`Error::FBig`].
    pub const FBIG: i32 = -27;
    /// Engine code for [`Error::Inval`].
    pub const INVAL: i32 = -22;
    /// Engine code for [`Error::NoSpc`].
    pub const NOSPC: i32 = -28;
    /// Engine code for [`Error::NoMem`].
    pub const NOMEM: i32 = -12;
    /// Engine code for [`Error::NoAttr`].
    pub const NOATTR: i32 = -61;
    /// Engine code for [`Error::NameTooLong`].
    pub const NAMETOOLONG: i32 = -36;
    /// Adapter code for [`Error::NoFdEntry`].
    pub const NO_FD_ENTRY: i32 = -50;
    /// Adapter code for [`Error::NoDdEntry`].
    pub const NO_DD_ENTRY: i32 = -51;

    /// Translate a negative engine code.
    ///
    /// Codes outside the known set are preserved in [`Error::Unknown`].
    ///
    /// # Examples
    ///
    /// ```
    /// use flashfs::Error;
    ///
    /// assert_eq!(Error::from_code(-2), Error::NoEnt);
    /// assert_eq!(Error::from_code(-1000), Error::Unknown(-1000));
    /// ```
    pub const fn from_code(code: i32) -> Self {
        match code {
            Self::IO => Self::Io,
            Self::CORRUPT => Self::Corrupt,
            Self::NOENT => Self::NoEnt,
            Self::EXIST => Self::Exist,
            Self::NOTDIR => Self::NotDir,
            Self::ISDIR => Self::IsDir,
            Self::NOTEMPTY => Self::NotEmpty,
            Self::BADF => Self::BadF,
            Self::FBIG => Self::FBig,
            Self::INVAL => Self::Inval,
            Self::NOSPC => Self::NoSpc,
            Self::NOMEM => Self::NoMem,
            Self::NOATTR => Self::NoAttr,
            Self::NAMETOOLONG => Self::NameTooLong,
            Self::NO_FD_ENTRY => Self::NoFdEntry,
            Self::NO_DD_ENTRY => Self::NoDdEntry,
            other => Self::Unknown(other),
        }
    }

    /// Translate a code returned by an engine.
    ///
    /// Like [`Error::from_code`], except that the adapter-only codes stay
    /// [`Error::Unknown`]: a handle miss is raised by the adapter's own
    /// lookup, never reported on an engine's behalf.
    ///
    /// ```
    /// use flashfs::Error;
    ///
    /// assert_eq!(Error::from_engine(-2), Error::NoEnt);
    /// assert_eq!(Error::from_engine(Error::NO_FD_ENTRY), Error::Unknown(-50));
    /// ```
    pub const fn from_engine(code: i32) -> Self {
        match Self::from_code(code) {
            Self::NoFdEntry | Self::NoDdEntry => Self::Unknown(code),
            other => other,
        }
    }

    /// The integer code of this error.
    pub const fn code(self) -> i32 {
        match self {
            Self::Io => Self::IO,
            Self::Corrupt => Self::CORRUPT,
            Self::NoEnt => Self::NOENT,
            Self::Exist => Self::EXIST,
            Self::NotDir => Self::NOTDIR,
            Self::IsDir => Self::ISDIR,
            Self::NotEmpty => Self::NOTEMPTY,
            Self::BadF => Self::BADF,
            Self::FBig => Self::FBIG,
            Self::Inval => Self::INVAL,
            Self::NoSpc => Self::NOSPC,
            Self::NoMem => Self::NOMEM,
            Self::NoAttr => Self::NOATTR,
            Self::NameTooLong => Self::NAMETOOLONG,
            Self::NoFdEntry => Self::NO_FD_ENTRY,
            Self::NoDdEntry => Self::NO_DD_ENTRY,
            Self::Unknown(code) => code,
        }
    }

    /// Whether the error was raised by the adapter's own handle lookup.
    #[inline]
    pub const fn is_handle_miss(self) -> bool {
        matches!(self, Self::NoFdEntry | Self::NoDdEntry)
    }
}

/// Translate an engine return code that carries no payload.
#[inline]
pub(crate) fn check(rc: i32) -> Result<()> {
    if rc < 0 {
        Err(Error::from_engine(rc))
    } else {
        Ok(())
    }
}

/// Translate an engine return code whose non-negative value is a count.
#[inline]
pub(crate) fn count(rc: i32) -> Result<usize> {
    if rc < 0 {
        Err(Error::from_engine(rc))
    } else {
        Ok(rc as usize)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "Error during device operation"),
            Self::Corrupt => write!(f, "Corrupted filesystem"),
            Self::NoEnt => write!(f, "No such directory entry"),
            Self::Exist => write!(f, "Entry already exists"),
            Self::NotDir => write!(f, "Entry is not a directory"),
            Self::IsDir => write!(f, "Entry is a directory"),
            Self::NotEmpty => write!(f, "Directory is not empty"),
            Self::BadF => write!(f, "Bad file number"),
            Self::FBig => write!(f, "File too large"),
            Self::Inval => write!(f, "Invalid parameter"),
            Self::NoSpc => write!(f, "No space left on device"),
            Self::NoMem => write!(f, "No more memory available"),
            Self::NoAttr => write!(f, "No attribute available"),
            Self::NameTooLong => write!(f, "File name too long"),
            Self::NoFdEntry => write!(f, "No entry for file handle"),
            Self::NoDdEntry => write!(f, "No entry for directory handle"),
            Self::Unknown(code) => write!(f, "Unknown engine error {}", code),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Error; 16] = [
        Error::Io,
        Error::Corrupt,
        Error::NoEnt,
        Error::Exist,
        Error::NotDir,
        Error::IsDir,
        Error::NotEmpty,
        Error::BadF,
        Error::FBig,
        Error::Inval,
        Error::NoSpc,
        Error::NoMem,
        Error::NoAttr,
        Error::NameTooLong,
        Error::NoFdEntry,
        Error::NoDdEntry,
    ];

    #[test]
    fn test_codes_are_distinct_and_negative() {
        for (i, a) in ALL.iter().enumerate() {
            assert!(a.code() < 0, "{:?} should have a negative code", a);
            for b in &ALL[i + 1..] {
                assert_ne!(a.code(), b.code(), "{:?} and {:?} share a code", a, b);
            }
        }
    }

    #[test]
    fn test_code_translation_is_lossless() {
        for err in ALL {
            assert_eq!(Error::from_code(err.code()), err);
        }
        assert_eq!(Error::from_code(-7), Error::Unknown(-7));
        assert_eq!(Error::Unknown(-7).code(), -7);
    }

    #[test]
    fn test_engine_codes_never_become_handle_misses() {
        assert_eq!(check(Error::NO_FD_ENTRY), Err(Error::Unknown(Error::NO_FD_ENTRY)));
        assert_eq!(count(Error::NO_DD_ENTRY), Err(Error::Unknown(Error::NO_DD_ENTRY)));
        assert_eq!(check(Error::NOSPC), Err(Error::NoSpc));
        assert_eq!(count(12), Ok(12));
        for err in ALL {
            assert!(!Error::from_engine(err.code()).is_handle_miss());
        }
    }

    #[test]
    fn test_check_and_count() {
        assert_eq!(check(0), Ok(()));
        assert_eq!(check(1), Ok(()));
        assert_eq!(check(-28), Err(Error::NoSpc));
        assert_eq!(count(42), Ok(42));
        assert_eq!(count(-84), Err(Error::Corrupt));
    }

    #[test]
    fn test_handle_miss_display() {
        assert!(Error::NoFdEntry.is_handle_miss());
        assert!(Error::NoDdEntry.is_handle_miss());
        assert!(!Error::NoEnt.is_handle_miss());

        let msg = format!("{}", Error::NoFdEntry);
        assert!(msg.contains("file handle"));
        let msg = format!("{}", Error::Unknown(-99));
        assert!(msg.contains("-99"));
    }
}
