//! Output directory assembly and archiving
//!
//! A build is a fixed sequence: validate the declaration, wipe the output
//! directory, copy declared files, copy declared directories, zip the result
//! into the output directory. The first error aborts the sequence; nothing is
//! rolled back.

pub mod archive;
pub mod builder;

pub use archive::{create_archive, list_archive};
pub use builder::{clean_output_dir, copy_dir_recursive, copy_file};

use crate::config::PackagerConfig;
use crate::error::BuildError;
use crate::models::{BuildEvent, BuildResult, CopiedEntry, EntryKind};
use crate::utils::{is_contained_relative, is_plain_file_name, without_cur_dir};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Build the extension rooted at `source_root`.
pub fn package(config: &PackagerConfig, source_root: &Path) -> Result<BuildResult, BuildError> {
    package_with_progress(config, source_root, |_| {})
}

/// Build the extension, reporting each step to `on_event` as it completes.
pub fn package_with_progress<F>(
    config: &PackagerConfig,
    source_root: &Path,
    mut on_event: F,
) -> Result<BuildResult, BuildError>
where
    F: FnMut(BuildEvent<'_>),
{
    validate_declaration(config)?;
    let out_dir = source_root.join(&config.out_dir);
    ensure_outside_source(source_root, &out_dir, config)?;

    tracing::info!(
        source = %source_root.display(),
        out = %out_dir.display(),
        "building extension"
    );

    clean_output_dir(&out_dir)?;
    on_event(BuildEvent::Cleaned { out_dir: &out_dir });

    let mut copied = Vec::new();
    let mut skipped = Vec::new();

    for name in &config.files {
        let from = source_root.join(name);
        let Some(meta) = stat_declared(&from)? else {
            tracing::debug!(file = %name, "declared file absent, skipping");
            on_event(BuildEvent::Skipped(Path::new(name)));
            skipped.push(PathBuf::from(name));
            continue;
        };
        if !meta.is_file() {
            return Err(BuildError::UnexpectedEntryType { path: from, expected: "file" });
        }

        let bytes = copy_file(&from, &out_dir.join(name))?;
        let entry = CopiedEntry {
            path: PathBuf::from(name),
            kind: EntryKind::File,
            files: 1,
            bytes,
        };
        on_event(BuildEvent::Copied(&entry));
        copied.push(entry);
    }

    for name in &config.dirs {
        let from = source_root.join(name);
        let Some(meta) = stat_declared(&from)? else {
            tracing::debug!(dir = %name, "declared directory absent, skipping");
            on_event(BuildEvent::Skipped(Path::new(name)));
            skipped.push(PathBuf::from(name));
            continue;
        };
        if !meta.is_dir() {
            return Err(BuildError::UnexpectedEntryType { path: from, expected: "directory" });
        }

        let (files, bytes) = copy_dir_recursive(&from, &out_dir.join(name))?;
        let entry = CopiedEntry {
            path: PathBuf::from(name),
            kind: EntryKind::Directory,
            files,
            bytes,
        };
        on_event(BuildEvent::Copied(&entry));
        copied.push(entry);
    }

    let archive_path = out_dir.join(&config.archive_name);
    let archive = create_archive(&out_dir, &archive_path, config.compression_level)?;
    on_event(BuildEvent::Archived(&archive));

    tracing::info!(
        copied = copied.len(),
        skipped = skipped.len(),
        archive_bytes = archive.size_bytes,
        "build finished"
    );

    Ok(BuildResult {
        source_root: source_root.to_path_buf(),
        out_dir,
        copied,
        skipped,
        archive,
    })
}

/// Reject declarations that could escape the source root or clobber it.
pub fn validate_declaration(config: &PackagerConfig) -> Result<(), BuildError> {
    for name in config.files.iter().chain(&config.dirs) {
        if !is_contained_relative(name) {
            return Err(BuildError::InvalidConfig(format!(
                "declared entry '{}' must be a relative path inside the source root",
                name
            )));
        }
    }

    if !(0..=9).contains(&config.compression_level) {
        return Err(BuildError::InvalidConfig(format!(
            "compression level {} is outside 0..=9",
            config.compression_level
        )));
    }

    let archive = config.archive_name.as_str();
    if !is_plain_file_name(archive) {
        return Err(BuildError::InvalidConfig(format!(
            "archive name '{}' must be a plain file name",
            archive
        )));
    }
    if config.out_dir.file_name().and_then(|n| n.to_str()) == Some(archive) {
        return Err(BuildError::InvalidConfig(format!(
            "archive name '{}' must differ from the output directory name",
            archive
        )));
    }
    if config
        .files
        .iter()
        .chain(&config.dirs)
        .any(|name| without_cur_dir(Path::new(name)) == Path::new(archive))
    {
        return Err(BuildError::InvalidConfig(format!(
            "archive name '{}' collides with a declared entry",
            archive
        )));
    }

    // Lexical overlap; symlinked layouts are caught once the paths are resolved.
    let out = without_cur_dir(&config.out_dir);
    if out.is_relative() {
        if let Some(name) = config
            .files
            .iter()
            .chain(&config.dirs)
            .find(|name| overlaps(&out, &without_cur_dir(Path::new(name))))
        {
            return Err(overlap_error(&config.out_dir, name));
        }
    }

    Ok(())
}

/// The output directory is wiped, so it must not contain the source root
/// or share any path with a declared input.
fn ensure_outside_source(
    source_root: &Path,
    out_dir: &Path,
    config: &PackagerConfig,
) -> Result<(), BuildError> {
    let root = source_root
        .canonicalize()
        .map_err(BuildError::fs("resolve", source_root))?;
    let out = resolve_nonexistent(out_dir)?;

    if root.starts_with(&out) {
        return Err(BuildError::InvalidConfig(format!(
            "output directory {} would delete the source root {}",
            out.display(),
            root.display()
        )));
    }

    for name in config.files.iter().chain(&config.dirs) {
        let declared = resolve_nonexistent(&source_root.join(name))?;
        if overlaps(&out, &declared) {
            return Err(overlap_error(out_dir, name));
        }
    }
    Ok(())
}

fn overlaps(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

fn overlap_error(out_dir: &Path, name: &str) -> BuildError {
    BuildError::InvalidConfig(format!(
        "output directory {} overlaps declared entry '{}'",
        out_dir.display(),
        name
    ))
}

/// Canonicalize the deepest existing ancestor and re-append the rest.
fn resolve_nonexistent(path: &Path) -> Result<PathBuf, BuildError> {
    let mut existing = path;
    let mut tail = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(resolved) => {
                return Ok(tail.iter().rev().fold(resolved, |acc, part| acc.join(part)));
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let (Some(name), Some(parent)) = (existing.file_name(), existing.parent()) else {
                    return Err(BuildError::InvalidConfig(format!(
                        "output directory {} cannot be resolved",
                        path.display()
                    )));
                };
                tail.push(name.to_os_string());
                existing = parent;
            }
            Err(err) => return Err(BuildError::fs("resolve", existing)(err)),
        }
    }
}

/// `Ok(None)` when the declared input is absent.
fn stat_declared(path: &Path) -> Result<Option<fs::Metadata>, BuildError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(BuildError::fs("stat", path)(err)),
    }
}
