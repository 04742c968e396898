//! Manifest data structures for MV3 extensions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Typed view of `manifest.json`.
///
/// Fields the verifier asserts on are optional here so that a missing field
/// surfaces as a failed check instead of a parse error. Anything not modelled
/// is kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_version: Option<u32>,

    #[serde(default)]
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host_permissions: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_scripts: Option<Vec<ContentScript>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icons: Option<BTreeMap<String, String>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Background {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_worker: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_popup: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_icon: Option<IconSet>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IconSet {
    Single(String),
    Multiple(BTreeMap<String, String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentScript {
    #[serde(default)]
    pub matches: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub js: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub css: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_at: Option<String>,

    #[serde(default)]
    pub all_frames: bool,
}

impl Manifest {
    pub fn service_worker(&self) -> Option<&str> {
        self.background
            .as_ref()
            .and_then(|bg| bg.service_worker.as_deref())
    }

    pub fn popup(&self) -> Option<&str> {
        self.action
            .as_ref()
            .and_then(|action| action.default_popup.as_deref())
    }

    /// Every script path referenced by a content-script rule, in declaration order.
    pub fn content_script_paths(&self) -> Vec<&str> {
        self.content_scripts
            .iter()
            .flatten()
            .flat_map(|cs| cs.js.iter().map(String::as_str))
            .collect()
    }
}
