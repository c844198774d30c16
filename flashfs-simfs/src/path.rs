//! Path normalisation.
//!
//! Paths are stored without leading or trailing separators; the root is the
//! empty string. `a//b/`, `/a/./b` and `a/c/../b` all name `a/b`.

use alloc::string::String;
use alloc::vec::Vec;

use flashfs::Error;

/// Longest name a single path component may have.
pub const NAME_MAX: usize = 255;

/// Normalise `path`, or return the engine error code describing why not.
pub fn normalize(path: &str) -> Result<String, i32> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name if name.len() > NAME_MAX => return Err(Error::NAMETOOLONG),
            name => parts.push(name),
        }
    }
    Ok(parts.join("/"))
}

/// Parent of a normalised path. The root is its own parent.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

/// Last component of a normalised path.
pub fn name(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Whether `path` lies strictly below `dir`.
pub fn is_below(path: &str, dir: &str) -> bool {
    if dir.is_empty() {
        return !path.is_empty();
    }
    path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
}

/// Join a directory and a name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        String::from(name)
    } else {
        let mut out = String::with_capacity(dir.len() + 1 + name.len());
        out.push_str(dir);
        out.push('/');
        out.push_str(name);
        out
    }
}
