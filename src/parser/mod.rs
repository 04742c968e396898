//! Parsing modules for manifest files

pub mod manifest;

pub use manifest::{parse_manifest, parse_manifest_document};
