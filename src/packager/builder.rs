//! Output directory assembly

use crate::error::BuildError;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;
use walkdir::WalkDir;

/// Remove `out_dir` entirely and recreate it empty.
pub fn clean_output_dir(out_dir: &Path) -> Result<(), BuildError> {
    match fs::remove_dir_all(out_dir) {
        Ok(()) => tracing::debug!(dir = %out_dir.display(), "removed previous output"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(BuildError::fs("remove", out_dir)(err)),
    }
    fs::create_dir_all(out_dir).map_err(BuildError::fs("create", out_dir))
}

/// Copy a single file, returning the number of bytes written.
pub fn copy_file(from: &Path, to: &Path) -> Result<u64, BuildError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(BuildError::fs("create", parent))?;
    }
    fs::copy(from, to).map_err(BuildError::fs("copy", from))
}

/// Copy a directory tree, preserving its structure.
///
/// Returns `(files, bytes)` copied. Symlinks are followed.
pub fn copy_dir_recursive(from: &Path, to: &Path) -> Result<(usize, u64), BuildError> {
    let mut files = 0;
    let mut bytes = 0;

    for entry in WalkDir::new(from).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|err| BuildError::walk(from, err))?;
        let relative = entry.path().strip_prefix(from).map_err(|_| BuildError::Filesystem {
            op: "relativize",
            path: entry.path().to_path_buf(),
            source: io::Error::other("entry outside of copied directory"),
        })?;
        let dest = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(BuildError::fs("create", &dest))?;
        } else {
            bytes += copy_file(entry.path(), &dest)?;
            files += 1;
        }
    }

    Ok((files, bytes))
}
