//! Build results

use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One declared top-level unit that made it into the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopiedEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub files: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub entries: usize,
}

/// Everything a finished build produced.
#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    pub source_root: PathBuf,
    pub out_dir: PathBuf,
    pub copied: Vec<CopiedEntry>,
    /// Declared inputs that were absent at the source root.
    pub skipped: Vec<PathBuf>,
    pub archive: ArchiveSummary,
}

impl BuildResult {
    pub fn copied_files(&self) -> usize {
        self.copied.iter().map(|entry| entry.files).sum()
    }

    pub fn copied_bytes(&self) -> u64 {
        self.copied.iter().map(|entry| entry.bytes).sum()
    }
}

/// Progress notifications emitted while a build runs, in order.
#[derive(Debug, Clone, Copy)]
pub enum BuildEvent<'a> {
    Cleaned { out_dir: &'a Path },
    Copied(&'a CopiedEntry),
    Skipped(&'a Path),
    Archived(&'a ArchiveSummary),
}
