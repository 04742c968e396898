//! Report generation

pub mod generator;

use crate::models::SuiteReport;
use anyhow::{Context, Result};
use std::path::Path;

pub use generator::{generate_json_report, generate_markdown_report};

pub fn write_json_report(report: &SuiteReport, path: &Path) -> Result<()> {
    let json = generate_json_report(report)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn write_markdown_report(report: &SuiteReport, path: &Path) -> Result<()> {
    std::fs::write(path, generate_markdown_report(report))
        .with_context(|| format!("Failed to write {}", path.display()))
}
