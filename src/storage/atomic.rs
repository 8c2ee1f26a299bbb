//! Crash-safe whole-file replacement

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Replace `path` with `data` atomically.
///
/// The bytes go to a temp file in the destination directory (same
/// filesystem, so the final rename is atomic), are flushed and synced, and
/// only then renamed over the destination. A failure at any step leaves the
/// destination's previous content untouched; the temp file is cleaned up on
/// drop.
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
