//! Artifact checks that need no browser

use crate::error::VerifyError;
use crate::models::Observation;
use crate::parser::manifest::read_manifest_document;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub const EXPECTED_MANIFEST_VERSION: i64 = 3;

pub fn load_manifest(extension_dir: &Path) -> Result<Value, VerifyError> {
    read_manifest_document(extension_dir.join("manifest.json"))
        .map_err(|err| VerifyError::Manifest(format!("{:#}", err)))
}

/// The output directory exists and every required path in it is a file.
pub fn build_completeness(extension_dir: &Path, required: &[String]) -> Result<(), VerifyError> {
    if !extension_dir.is_dir() {
        return Err(VerifyError::assertion(format!(
            "{} is not a directory",
            extension_dir.display()
        )));
    }

    let missing: Vec<&str> = required
        .iter()
        .filter(|rel| !extension_dir.join(rel.as_str()).is_file())
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(VerifyError::assertion(format!(
            "missing required files: {}",
            missing.join(", ")
        )))
    }
}

pub fn archive_presence(archive_path: &Path) -> Result<Observation, VerifyError> {
    let meta = fs::metadata(archive_path).map_err(|err| {
        VerifyError::assertion(format!("{} not found: {}", archive_path.display(), err))
    })?;
    if !meta.is_file() {
        return Err(VerifyError::assertion(format!(
            "{} is not a file",
            archive_path.display()
        )));
    }
    if meta.len() == 0 {
        return Err(VerifyError::assertion(format!(
            "{} is empty",
            archive_path.display()
        )));
    }
    Ok(Observation::new("archive_bytes", meta.len()))
}

/// Schema version, name and permissions, as the popup scenario requires.
pub fn manifest_identity(manifest: &Value) -> Result<(), VerifyError> {
    let version = manifest.get("manifest_version").and_then(as_integer);
    if version != Some(EXPECTED_MANIFEST_VERSION) {
        return Err(VerifyError::assertion(format!(
            "manifest_version must be {}, found {}",
            EXPECTED_MANIFEST_VERSION,
            describe(manifest.get("manifest_version"))
        )));
    }

    match manifest.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => {}
        _ => return Err(VerifyError::assertion("manifest name is missing or empty")),
    }

    match manifest.get("permissions") {
        Some(Value::Null) | None => Err(VerifyError::assertion("manifest permissions are missing")),
        Some(_) => Ok(()),
    }
}

pub fn background_registration(manifest: &Value) -> Result<Observation, VerifyError> {
    match manifest.pointer("/background/service_worker") {
        Some(Value::Null) | None => Err(VerifyError::assertion(
            "manifest does not register background.service_worker",
        )),
        Some(worker) => Ok(Observation::new("service_worker", worker.clone())),
    }
}

pub fn content_script_registration(manifest: &Value) -> Result<Observation, VerifyError> {
    match manifest.get("content_scripts") {
        Some(Value::Array(rules)) if !rules.is_empty() => {
            Ok(Observation::new("content_script_rules", rules.len()))
        }
        Some(Value::Array(_)) => Err(VerifyError::assertion("content_scripts is empty")),
        Some(Value::Null) | None => Err(VerifyError::assertion("content_scripts is missing")),
        Some(other) => Err(VerifyError::assertion(format!(
            "content_scripts must be an array, found {}",
            type_name(other)
        ))),
    }
}

pub fn icon_presence(icons_dir: &Path) -> Result<Observation, VerifyError> {
    if !icons_dir.is_dir() {
        return Err(VerifyError::assertion(format!(
            "{} is not a directory",
            icons_dir.display()
        )));
    }
    let count = fs::read_dir(icons_dir)
        .map_err(|err| {
            VerifyError::assertion(format!("cannot list {}: {}", icons_dir.display(), err))
        })?
        .count();
    if count == 0 {
        return Err(VerifyError::assertion(format!(
            "{} contains no icons",
            icons_dir.display()
        )));
    }
    Ok(Observation::new("icon_entries", count))
}

// json5 may hand integers back as floats
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "nothing".to_string(),
        Some(value) => value.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
