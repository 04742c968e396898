//! Zip archive creation and inspection

use crate::error::BuildError;
use crate::models::ArchiveSummary;
use crate::utils::archive_entry_name;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, DateTime, ZipArchive};

/// Zip every file under `source_dir` into `archive_path`.
///
/// The archive may live inside `source_dir`; it is never added to itself.
/// Entries are sorted and stamped with a fixed timestamp, so identical trees
/// produce identical archives.
pub fn create_archive(
    source_dir: &Path,
    archive_path: &Path,
    compression_level: i32,
) -> Result<ArchiveSummary, BuildError> {
    let file = File::create(archive_path).map_err(BuildError::fs("create", archive_path))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(compression_level))
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut entries = 0;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|err| BuildError::walk(source_dir, err))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path == archive_path {
            continue;
        }

        let relative = path.strip_prefix(source_dir).map_err(|_| BuildError::Filesystem {
            op: "relativize",
            path: path.to_path_buf(),
            source: io::Error::other("entry outside of archive root"),
        })?;

        zip.start_file(archive_entry_name(relative), options)
            .map_err(BuildError::archive(archive_path))?;
        let mut input = File::open(path).map_err(BuildError::fs("read", path))?;
        io::copy(&mut input, &mut zip).map_err(BuildError::fs("compress", path))?;
        entries += 1;
    }

    let mut writer = zip.finish().map_err(BuildError::archive(archive_path))?;
    writer.flush().map_err(BuildError::fs("flush", archive_path))?;
    drop(writer);

    let size_bytes = fs::metadata(archive_path)
        .map_err(BuildError::fs("stat", archive_path))?
        .len();

    tracing::debug!(archive = %archive_path.display(), entries, size_bytes, "archive written");

    Ok(ArchiveSummary {
        path: archive_path.to_path_buf(),
        size_bytes,
        entries,
    })
}

/// Sorted entry names of an existing archive.
pub fn list_archive(archive_path: &Path) -> Result<Vec<String>, BuildError> {
    let file = File::open(archive_path).map_err(BuildError::fs("open", archive_path))?;
    let archive = ZipArchive::new(file).map_err(BuildError::archive(archive_path))?;

    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Read;
    use tempfile::TempDir;

    fn populate(dir: &Path) {
        fs::create_dir_all(dir.join("src/content")).unwrap();
        fs::write(dir.join("manifest.json"), r#"{"manifest_version": 3}"#).unwrap();
        fs::write(dir.join("src/content/content.js"), "console.log('hi');").unwrap();
    }

    #[test]
    fn test_archive_excludes_itself() {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path());
        let archive_path = temp_dir.path().join("extension.zip");

        let summary = create_archive(temp_dir.path(), &archive_path, 9).unwrap();

        assert_eq!(summary.entries, 2);
        assert!(summary.size_bytes > 0);
        assert_eq!(
            list_archive(&archive_path).unwrap(),
            vec!["manifest.json", "src/content/content.js"]
        );
    }

    #[test]
    fn test_archive_content_matches_source() {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path());
        let archive_path = temp_dir.path().join("extension.zip");
        create_archive(temp_dir.path(), &archive_path, 9).unwrap();

        let mut archive = ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let mut entry = archive.by_name("src/content/content.js").unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "console.log('hi');");
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
    }

    #[test]
    fn test_archive_is_reproducible() {
        let temp_dir = TempDir::new().unwrap();
        let tree = temp_dir.path().join("tree");
        populate(&tree);

        let first = temp_dir.path().join("first.zip");
        let second = temp_dir.path().join("second.zip");
        create_archive(&tree, &first, 9).unwrap();
        create_archive(&tree, &second, 9).unwrap();

        assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
    }

    #[test]
    fn test_missing_source_is_filesystem_error() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("extension.zip");

        let err = create_archive(&temp_dir.path().join("missing"), &archive_path, 9).unwrap_err();
        assert!(matches!(err, BuildError::Filesystem { op: "walk", .. }));
    }
}
