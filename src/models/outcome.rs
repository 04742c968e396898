//! Scenario identities and verification outcomes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioId {
    ExtensionLoad,
    PopupReachability,
    ContentScriptInjection,
    BuildCompleteness,
    ArchivePresence,
    BackgroundRegistration,
    ContentScriptRegistration,
    IconPresence,
}

impl ScenarioId {
    /// Declaration order, which is also execution order.
    pub const ALL: [ScenarioId; 8] = [
        ScenarioId::ExtensionLoad,
        ScenarioId::PopupReachability,
        ScenarioId::ContentScriptInjection,
        ScenarioId::BuildCompleteness,
        ScenarioId::ArchivePresence,
        ScenarioId::BackgroundRegistration,
        ScenarioId::ContentScriptRegistration,
        ScenarioId::IconPresence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioId::ExtensionLoad => "extension-load",
            ScenarioId::PopupReachability => "popup-reachability",
            ScenarioId::ContentScriptInjection => "content-script-injection",
            ScenarioId::BuildCompleteness => "build-completeness",
            ScenarioId::ArchivePresence => "archive-presence",
            ScenarioId::BackgroundRegistration => "background-registration",
            ScenarioId::ContentScriptRegistration => "content-script-registration",
            ScenarioId::IconPresence => "icon-presence",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ScenarioId::ExtensionLoad => "Extension loads successfully",
            ScenarioId::PopupReachability => "Extension popup is reachable",
            ScenarioId::ContentScriptInjection => "Content script was injected",
            ScenarioId::BuildCompleteness => "Build output contains required files",
            ScenarioId::ArchivePresence => "Extension archive was created",
            ScenarioId::BackgroundRegistration => "Service worker is registered in the manifest",
            ScenarioId::ContentScriptRegistration => "Content script is registered in the manifest",
            ScenarioId::IconPresence => "Icons are present in the build",
        }
    }

    /// Whether the scenario launches a browser session.
    pub fn needs_browser(self) -> bool {
        matches!(
            self,
            ScenarioId::ExtensionLoad
                | ScenarioId::PopupReachability
                | ScenarioId::ContentScriptInjection
        )
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = ScenarioId::ALL.iter().map(|id| id.as_str()).collect();
                format!("unknown scenario '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
}

/// A value a scenario looked at without necessarily asserting on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub label: String,
    pub value: serde_json::Value,
}

impl Observation {
    pub fn new(label: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub id: ScenarioId,
    pub title: String,
    pub status: Status,
    pub attempts: u32,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<Observation>,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        self.status == Status::Passed
    }
}

/// Aggregate of one verification run; outcomes are in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub extension_dir: PathBuf,
    pub outcomes: Vec<ScenarioOutcome>,
    pub duration_ms: u64,
}

impl SuiteReport {
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.passed_count()
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(ScenarioOutcome::passed)
    }

    pub fn outcome(&self, id: ScenarioId) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|o| o.id == id)
    }
}
