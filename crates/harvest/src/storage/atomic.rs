//! Whole-file replace via temp file + rename

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Sibling temp path for `path` (same directory, so the rename stays on one filesystem)
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace the contents of `path` with `data` atomically.
///
/// Readers see either the previous contents or the new contents, never a
/// mix. On failure the previous file is left untouched.
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let temp = temp_path(path);

    let result = (|| {
        let mut file = File::create(&temp)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&temp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}
