//! Manifest parsing functionality

use crate::models::Manifest;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Parse manifest.json from bytes
pub fn parse_manifest(content: &[u8]) -> Result<Manifest> {
    let content_str = std::str::from_utf8(content)
        .context("Invalid UTF-8 in manifest.json")?;

    // json5 accepts comments and trailing commas, which extension authors use
    let manifest: Manifest = json5::from_str(content_str)
        .context("Failed to parse manifest.json")?;

    Ok(manifest)
}

/// Parse manifest.json into an untyped document.
///
/// Shape checks (is this field an array, is it present at all) run against
/// this form so that one malformed field cannot hide the others.
pub fn parse_manifest_document(content: &[u8]) -> Result<Value> {
    let content_str = std::str::from_utf8(content)
        .context("Invalid UTF-8 in manifest.json")?;

    let document: Value = json5::from_str(content_str)
        .context("Failed to parse manifest.json")?;

    if !document.is_object() {
        anyhow::bail!("manifest.json must contain a JSON object");
    }

    Ok(document)
}

/// Parse manifest.json from file path
pub fn parse_manifest_from_file(path: impl AsRef<Path>) -> Result<Manifest> {
    let path = path.as_ref();
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_manifest(&content)
}

/// Read and parse manifest.json as an untyped document
pub fn read_manifest_document(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_manifest_document(&content)
}

/// Parse manifest.json from string
pub fn parse_manifest_from_str(content: &str) -> Result<Manifest> {
    parse_manifest(content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_manifest() {
        let json = r#"{
            "manifest_version": 3,
            "name": "Test Extension",
            "version": "1.0.0"
        }"#;

        let manifest = parse_manifest_from_str(json).unwrap();
        assert_eq!(manifest.manifest_version, Some(3));
        assert_eq!(manifest.name, "Test Extension");
        assert_eq!(manifest.version.as_deref(), Some("1.0.0"));
        assert!(manifest.permissions.is_none());
    }

    #[test]
    fn test_parse_entry_points() {
        let json = r#"{
            "manifest_version": 3,
            "name": "Test",
            "permissions": ["storage", "activeTab"],
            "action": { "default_popup": "src/popup/popup.html" },
            "background": {
                "service_worker": "src/background/service-worker.js",
                "type": "module"
            },
            "content_scripts": [
                { "matches": ["<all_urls>"], "js": ["src/content/content.js"] }
            ]
        }"#;

        let manifest = parse_manifest_from_str(json).unwrap();
        assert_eq!(manifest.service_worker(), Some("src/background/service-worker.js"));
        assert_eq!(manifest.popup(), Some("src/popup/popup.html"));
        assert_eq!(manifest.content_script_paths(), vec!["src/content/content.js"]);
        assert_eq!(manifest.background.unwrap().kind.as_deref(), Some("module"));
    }

    #[test]
    fn test_parse_with_comments() {
        let json = r#"{
            // This is a comment
            "manifest_version": 3,
            "name": "Test Extension", // inline comment
            /* Block comment */
            "version": "1.0.0",
        }"#;

        let manifest = parse_manifest_from_str(json).unwrap();
        assert_eq!(manifest.manifest_version, Some(3));
        assert_eq!(manifest.name, "Test Extension");
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let json = r#"{ "manifest_version": 3, "name": "X", "minimum_chrome_version": "120" }"#;

        let manifest = parse_manifest_from_str(json).unwrap();
        assert_eq!(
            manifest.extra.get("minimum_chrome_version"),
            Some(&Value::String("120".to_string()))
        );
    }

    #[test]
    fn test_document_rejects_non_object() {
        assert!(parse_manifest_document(b"[1, 2, 3]").is_err());
        assert!(parse_manifest_document(b"{ not json").is_err());
    }
}
