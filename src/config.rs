//! Build and verification settings
//!
//! Every field has a default matching the conventional extension layout, so
//! a missing `extpack.toml` is not an error. A file, when present, only needs
//! the fields it overrides:
//!
//! ```toml
//! [build]
//! dirs = ["src", "icons", "_locales"]
//!
//! [verify]
//! content_url = "https://example.org"
//! probe = "observe"
//! ```

use crate::error::ConfigError;
use crate::models::ScenarioId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "extpack.toml";

/// Retry count applied in unattended runs when none is configured.
pub const CI_RETRIES: u32 = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtpackConfig {
    pub build: PackagerConfig,
    pub verify: VerifierConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackagerConfig {
    /// Top-level files copied when present.
    pub files: Vec<String>,
    /// Top-level directories copied recursively when present.
    pub dirs: Vec<String>,
    /// Relative paths resolve against the source root.
    pub out_dir: PathBuf,
    pub archive_name: String,
    pub compression_level: i32,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            files: vec![
                "manifest.json".to_string(),
                "package.json".to_string(),
                "playwright.config.ts".to_string(),
            ],
            dirs: vec!["src".to_string(), "icons".to_string(), "tests".to_string()],
            out_dir: PathBuf::from("dist"),
            archive_name: "extension.zip".to_string(),
            compression_level: 9,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

/// How runtime-binding probes are judged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// The probe must evaluate to `true`.
    #[default]
    Strict,
    /// The probe must complete; its value is only recorded.
    Observe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    /// Defaults to the build's output directory.
    pub extension_dir: Option<PathBuf>,
    /// Defaults to the build's archive name.
    pub archive_name: Option<String>,
    pub required_files: Vec<String>,
    pub icons_dir: String,
    pub content_url: String,
    pub popup_settle_ms: u64,
    pub content_settle_ms: u64,
    pub scenario_timeout_ms: u64,
    pub assertion_timeout_ms: u64,
    /// `None` means: retry only when running under CI.
    pub retries: Option<u32>,
    pub execution: ExecutionMode,
    pub max_parallel: usize,
    pub probe: ProbeMode,
    /// Empty means every scenario.
    pub only: Vec<ScenarioId>,
    pub chrome_executable: Option<PathBuf>,
    pub extra_args: Vec<String>,
    pub no_sandbox: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            extension_dir: None,
            archive_name: None,
            required_files: vec![
                "manifest.json".to_string(),
                "src/popup/popup.html".to_string(),
                "src/background/service-worker.js".to_string(),
                "src/content/content.js".to_string(),
            ],
            icons_dir: "icons".to_string(),
            content_url: "https://example.com".to_string(),
            popup_settle_ms: 1000,
            content_settle_ms: 500,
            scenario_timeout_ms: 30_000,
            assertion_timeout_ms: 5_000,
            retries: None,
            execution: ExecutionMode::Sequential,
            max_parallel: 2,
            probe: ProbeMode::Strict,
            only: Vec::new(),
            chrome_executable: None,
            extra_args: Vec::new(),
            no_sandbox: false,
        }
    }
}

impl VerifierConfig {
    pub fn effective_retries(&self) -> u32 {
        self.retries_for(running_under_ci())
    }

    pub fn retries_for(&self, unattended: bool) -> u32 {
        match self.retries {
            Some(retries) => retries,
            None if unattended => CI_RETRIES,
            None => 0,
        }
    }

    /// Scenarios to run, in declaration order.
    pub fn selected_scenarios(&self) -> Vec<ScenarioId> {
        ScenarioId::ALL
            .into_iter()
            .filter(|id| self.only.is_empty() || self.only.contains(id))
            .collect()
    }

    pub fn scenario_timeout(&self) -> Duration {
        Duration::from_millis(self.scenario_timeout_ms)
    }

    pub fn assertion_timeout(&self) -> Duration {
        Duration::from_millis(self.assertion_timeout_ms)
    }
}

/// The artifact a verification run points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyTarget {
    pub extension_dir: PathBuf,
    pub archive_name: String,
}

impl VerifyTarget {
    pub fn archive_path(&self) -> PathBuf {
        self.extension_dir.join(&self.archive_name)
    }
}

impl ExtpackConfig {
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Load `extpack.toml` from the source root, falling back to defaults.
    pub fn discover(source_root: &Path) -> Result<Self, ConfigError> {
        let candidate = source_root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading configuration");
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve what the verifier should look at, relative to `source_root`.
    pub fn verify_target(&self, source_root: &Path) -> VerifyTarget {
        let dir = self
            .verify
            .extension_dir
            .as_deref()
            .unwrap_or(&self.build.out_dir);
        VerifyTarget {
            extension_dir: source_root.join(dir),
            archive_name: self
                .verify
                .archive_name
                .clone()
                .unwrap_or_else(|| self.build.archive_name.clone()),
        }
    }
}

fn running_under_ci() -> bool {
    std::env::var("CI")
        .map(|value| !value.is_empty() && value != "false")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_conventional_layout() {
        let config = ExtpackConfig::default();
        assert_eq!(config.build.out_dir, PathBuf::from("dist"));
        assert_eq!(config.build.archive_name, "extension.zip");
        assert_eq!(config.build.compression_level, 9);
        assert_eq!(config.verify.execution, ExecutionMode::Sequential);
        assert_eq!(config.verify.probe, ProbeMode::Strict);
        assert_eq!(config.verify.selected_scenarios().len(), ScenarioId::ALL.len());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let toml = r#"
            [build]
            dirs = ["src", "icons", "_locales"]

            [verify]
            probe = "observe"
            execution = "parallel"
            only = ["archive-presence", "icon-presence"]
        "#;

        let config = ExtpackConfig::from_toml_str(toml, Path::new("extpack.toml")).unwrap();
        assert_eq!(config.build.dirs, vec!["src", "icons", "_locales"]);
        assert_eq!(config.build.files, PackagerConfig::default().files);
        assert_eq!(config.verify.probe, ProbeMode::Observe);
        assert_eq!(config.verify.execution, ExecutionMode::Parallel);
        assert_eq!(
            config.verify.selected_scenarios(),
            vec![ScenarioId::ArchivePresence, ScenarioId::IconPresence]
        );
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = ExtpackConfig::from_toml_str("[build]\nouput = \"x\"", Path::new("extpack.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_retries_only_when_unattended() {
        let mut config = VerifierConfig::default();
        assert_eq!(config.retries_for(false), 0);
        assert_eq!(config.retries_for(true), CI_RETRIES);

        config.retries = Some(5);
        assert_eq!(config.retries_for(false), 5);
        assert_eq!(config.retries_for(true), 5);
    }

    #[test]
    fn test_verify_target_follows_build_output() {
        let mut config = ExtpackConfig::default();
        config.build.out_dir = PathBuf::from("out");

        let target = config.verify_target(Path::new("/ext"));
        assert_eq!(target.extension_dir, PathBuf::from("/ext/out"));
        assert_eq!(target.archive_path(), PathBuf::from("/ext/out/extension.zip"));

        config.verify.extension_dir = Some(PathBuf::from("/elsewhere"));
        assert_eq!(config.verify_target(Path::new("/ext")).extension_dir, PathBuf::from("/elsewhere"));
    }

    #[test]
    fn test_discover_without_file_uses_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = ExtpackConfig::discover(temp_dir.path()).unwrap();
        assert_eq!(config.build, PackagerConfig::default());
    }
}
