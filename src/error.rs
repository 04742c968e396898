//! Error types for packaging, verification and configuration

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Fatal build failure. Any of these aborts the whole build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to {op} {}: {source}", path.display())]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("archive stream failed while writing {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("declared {expected} {} is not a {expected}", path.display())]
    UnexpectedEntryType {
        path: PathBuf,
        expected: &'static str,
    },

    #[error("invalid build configuration: {0}")]
    InvalidConfig(String),
}

impl BuildError {
    /// Builds a closure suitable for `map_err` on an I/O result.
    pub(crate) fn fs<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| Self::Filesystem {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn walk(root: &Path, err: walkdir::Error) -> Self {
        let path = err
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());
        Self::Filesystem {
            op: "walk",
            path,
            source: err.into(),
        }
    }

    pub(crate) fn archive(path: &Path) -> impl FnOnce(zip::result::ZipError) -> Self + '_ {
        move |source| Self::Archive {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Failure of a single verification scenario. Never fatal to the suite.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("browser session could not be acquired: {0}")]
    SessionAcquisition(String),

    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("{what} timed out after {}ms", after.as_millis())]
    Timeout { what: String, after: Duration },

    #[error("browser protocol error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("manifest could not be read: {0}")]
    Manifest(String),
}

impl VerifyError {
    pub(crate) fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }
}

/// Configuration file could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
