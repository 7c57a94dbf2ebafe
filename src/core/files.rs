// ─── File helpers ───
// Path-carrying IO wrappers and the temp-file-then-rename write used for the
// lock file and for downloaded artifacts.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::core::error::{McpmError, McpmResult};

pub fn create_dir_safe(path: &Path) -> McpmResult<()> {
    fs::create_dir_all(path).map_err(|source| McpmError::io(path, source))
}

/// Sibling path used while `dest` is being written.
///
/// Lives in the same directory so the final rename never crosses a
/// filesystem boundary.
pub fn temp_sibling(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}.{}.part", name, Uuid::new_v4().simple()))
}

/// Write `bytes` to `dest` so that readers see either the old file or the
/// complete new one.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> McpmResult<()> {
    let tmp = temp_sibling(dest);

    // Scope the handle so it is closed before the rename.
    let written = {
        let mut file = fs::File::create(&tmp).map_err(|e| McpmError::io(&tmp, e))?;
        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| McpmError::io(&tmp, e))
    };

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    persist(&tmp, dest)
}

/// Move a fully written temp file into place.
pub fn persist(tmp: &Path, dest: &Path) -> McpmResult<()> {
    fs::rename(tmp, dest).map_err(|source| {
        let _ = fs::remove_file(tmp);
        McpmError::io(dest, source)
    })
}
