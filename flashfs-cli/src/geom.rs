//! Geometry sidecar files
//!
//! `flashfs format` records the geometry of an image in `<image>.geom`, one
//! `key=value` pair per line:
//!
//! ```text
//! read_size=16
//! prog_size=16
//! block_size=4096
//! block_count=256
//! block_cycles=500
//! cache_size=64
//! lookahead_size=16
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use flashfs::Geometry;

/// Location of the sidecar for `image`.
pub fn sidecar_path(image: &Path) -> PathBuf {
    let mut name = OsString::from(image.as_os_str());
    name.push(".geom");
    PathBuf::from(name)
}

/// Render `geometry` in sidecar format.
pub fn to_sidecar(geometry: &Geometry) -> String {
    format!(
        "read_size={}\nprog_size={}\nblock_size={}\nblock_count={}\nblock_cycles={}\ncache_size={}\nlookahead_size={}\n",
        geometry.read_size,
        geometry.prog_size,
        geometry.block_size,
        geometry.block_count,
        geometry.block_cycles,
        geometry.cache_size,
        geometry.lookahead_size
    )
}

/// Parse sidecar text. Every key must be present exactly once.
pub fn parse_sidecar(text: &str) -> Result<Geometry> {
    let mut values: [Option<i64>; 7] = [None; 7];
    const KEYS: [&str; 7] = [
        "read_size",
        "prog_size",
        "block_size",
        "block_count",
        "block_cycles",
        "cache_size",
        "lookahead_size",
    ];

    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            bail!("line {}: expected key=value, got '{}'", n + 1, line);
        };
        let key = key.trim();
        let Some(slot) = KEYS.iter().position(|k| *k == key) else {
            bail!("line {}: unknown key '{}'", n + 1, key);
        };
        if values[slot].is_some() {
            bail!("line {}: duplicate key '{}'", n + 1, key);
        }
        let value: i64 = value
            .trim()
            .parse()
            .with_context(|| format!("line {}: invalid value for '{}'", n + 1, key))?;
        values[slot] = Some(value);
    }

    let get = |slot: usize| -> Result<i64> {
        values[slot].with_context(|| format!("missing key '{}'", KEYS[slot]))
    };
    for slot in 0..KEYS.len() {
        get(slot)?;
    }
    let size = |slot: usize| -> Result<u32> {
        let value = get(slot)?;
        u32::try_from(value).with_context(|| format!("'{}' out of range: {}", KEYS[slot], value))
    };
    let cycles = get(4)?;
    let cycles = i32::try_from(cycles)
        .with_context(|| format!("'block_cycles' out of range: {}", cycles))?;

    Ok(Geometry::new(
        size(0)?,
        size(1)?,
        size(2)?,
        size(3)?,
        cycles,
        size(5)?,
        size(6)?,
    ))
}

/// Write the sidecar for `image`.
pub fn save(image: &Path, geometry: &Geometry) -> Result<()> {
    let path = sidecar_path(image);
    fs::write(&path, to_sidecar(geometry))
        .with_context(|| format!("Failed to write geometry to {}", path.display()))
}

/// Read the sidecar for `image`.
pub fn load(image: &Path) -> Result<Geometry> {
    let path = sidecar_path(image);
    let text = fs::read_to_string(&path).with_context(|| {
        format!(
            "Failed to read geometry from {} (was the image created with 'flashfs format'?)",
            path.display()
        )
    })?;
    parse_sidecar(&text).with_context(|| format!("Invalid geometry file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> Geometry {
        Geometry::new(16, 16, 4096, 256, -1, 64, 16)
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(sidecar_path(Path::new("dir/flash.img")), PathBuf::from("dir/flash.img.geom"));
    }

    #[test]
    fn test_sidecar_text_round_trip() {
        let text = to_sidecar(&geometry());
        assert!(text.contains("block_cycles=-1\n"));
        assert_eq!(parse_sidecar(&text).unwrap(), geometry());
    }

    #[test]
    fn test_comments_and_order() {
        let text = "# written by hand\n\nlookahead_size = 8\nblock_count=4\nblock_size=256\n\
                    read_size=16\nprog_size=16\nblock_cycles=500\ncache_size=16\n";
        let parsed = parse_sidecar(text).unwrap();
        assert_eq!(parsed, Geometry::new(16, 16, 256, 4, 500, 16, 8));
    }

    #[test]
    fn test_rejects_bad_files() {
        let err = parse_sidecar("read_size=16\n").unwrap_err();
        assert!(err.to_string().contains("missing key 'prog_size'"));

        let err = parse_sidecar("color=blue\n").unwrap_err();
        assert!(err.to_string().contains("unknown key"));

        let err = parse_sidecar("read_size=16\nread_size=32\n").unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        let err = parse_sidecar("block_size=-4\n").unwrap_err();
        assert!(err.to_string().contains("missing key") || err.to_string().contains("out of range"));
    }

    #[test]
    fn test_missing_keys_reported_in_file_order() {
        let err = parse_sidecar("read_size=16\nblock_cycles=500\n").unwrap_err();
        assert_eq!(err.to_string(), "missing key 'prog_size'");

        let mut text = to_sidecar(&geometry());
        text = text.replace("lookahead_size=16\n", "");
        assert_eq!(parse_sidecar(&text).unwrap_err().to_string(), "missing key 'lookahead_size'");

        let text = to_sidecar(&geometry()).replace("block_size=4096", "block_size=-4");
        assert!(parse_sidecar(&text).unwrap_err().to_string().contains("'block_size' out of range"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("flash.img");
        save(&image, &geometry()).unwrap();
        assert_eq!(load(&image).unwrap(), geometry());

        let missing = dir.path().join("other.img");
        assert!(load(&missing).unwrap_err().to_string().contains("flashfs format"));
    }
}
