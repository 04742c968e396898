//! Browser-backed scenarios
//!
//! These launch Chromium and load the built extension unpacked, so they are
//! ignored by default. Run with `cargo test -- --ignored` on a machine with
//! Chrome or Chromium installed (set `CHROME` to pick a binary).

use extpack::config::ProbeMode;
use extpack::models::{ScenarioId, Status};
use extpack::verifier::{BrowserSession, SessionSettings};
use extpack::{package, run_suite, ExtpackConfig, VerifierConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn create_extension_source(root: &Path) {
    fs::write(
        root.join("manifest.json"),
        r#"{
            "manifest_version": 3,
            "name": "Browser Test",
            "version": "1.0.0",
            "permissions": ["storage"],
            "action": { "default_popup": "src/popup/popup.html" },
            "background": { "service_worker": "src/background/service-worker.js" },
            "content_scripts": [{ "matches": ["<all_urls>"], "js": ["src/content/content.js"] }]
        }"#,
    )
    .unwrap();
    for (path, content) in [
        ("src/popup/popup.html", "<html><body>popup</body></html>"),
        ("src/background/service-worker.js", "self.addEventListener('install', () => {});"),
        ("src/content/content.js", "document.documentElement.dataset.extpack = '1';"),
        ("icons/icon16.png", "png"),
    ] {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
}

fn browser_config() -> VerifierConfig {
    VerifierConfig {
        chrome_executable: std::env::var_os("CHROME").map(PathBuf::from),
        no_sandbox: true,
        retries: Some(0),
        ..VerifierConfig::default()
    }
}

#[tokio::test]
#[ignore = "requires a Chromium installation"]
async fn test_session_acquire_and_release() {
    let temp_dir = TempDir::new().unwrap();
    create_extension_source(temp_dir.path());
    let build = package(&ExtpackConfig::default().build, temp_dir.path()).unwrap();

    let config = browser_config();
    let settings = SessionSettings {
        chrome_executable: config.chrome_executable.clone(),
        extra_args: Vec::new(),
        no_sandbox: true,
        assertion_timeout: Duration::from_secs(10),
    };

    let session = BrowserSession::acquire(&build.out_dir, &settings).await.unwrap();
    session.goto("about:blank").await.unwrap();
    assert!(session.is_alive().await);
    session.probe_runtime().await.unwrap();
    session.release().await;
}

#[tokio::test]
#[ignore = "requires a Chromium installation"]
async fn test_popup_reachability_with_real_browser() {
    let temp_dir = TempDir::new().unwrap();
    create_extension_source(temp_dir.path());
    let config = ExtpackConfig::default();
    package(&config.build, temp_dir.path()).unwrap();

    let verify = VerifierConfig {
        only: vec![ScenarioId::PopupReachability],
        ..browser_config()
    };
    let report = run_suite(config.verify_target(temp_dir.path()), verify).await;

    let outcome = report.outcome(ScenarioId::PopupReachability).unwrap();
    assert_eq!(outcome.status, Status::Passed, "{:?}", outcome.message);
}

#[tokio::test]
#[ignore = "requires a Chromium installation"]
async fn test_observe_mode_records_probes() {
    let temp_dir = TempDir::new().unwrap();
    create_extension_source(temp_dir.path());
    let config = ExtpackConfig::default();
    package(&config.build, temp_dir.path()).unwrap();

    let verify = VerifierConfig {
        only: vec![ScenarioId::ExtensionLoad, ScenarioId::ContentScriptInjection],
        probe: ProbeMode::Observe,
        ..browser_config()
    };
    let report = run_suite(config.verify_target(temp_dir.path()), verify).await;

    for outcome in &report.outcomes {
        assert_eq!(outcome.status, Status::Passed, "{}: {:?}", outcome.id, outcome.message);
        assert_eq!(outcome.observations.len(), 1);
    }
}

#[tokio::test]
async fn test_launch_failure_fails_only_its_scenario() {
    let temp_dir = TempDir::new().unwrap();
    create_extension_source(temp_dir.path());
    let config = ExtpackConfig::default();
    package(&config.build, temp_dir.path()).unwrap();

    let verify = VerifierConfig {
        chrome_executable: Some(temp_dir.path().join("no-such-chrome")),
        only: vec![ScenarioId::ExtensionLoad, ScenarioId::ArchivePresence],
        retries: Some(0),
        ..VerifierConfig::default()
    };
    let report = run_suite(config.verify_target(temp_dir.path()), verify).await;

    let load = report.outcome(ScenarioId::ExtensionLoad).unwrap();
    assert_eq!(load.status, Status::Failed);
    assert!(load
        .message
        .as_deref()
        .unwrap()
        .starts_with("browser session could not be acquired"));
    assert_eq!(
        report.outcome(ScenarioId::ArchivePresence).unwrap().status,
        Status::Passed
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_stalled_browser_times_out_without_blocking_the_suite() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    create_extension_source(temp_dir.path());
    let config = ExtpackConfig::default();
    package(&config.build, temp_dir.path()).unwrap();

    // Never prints a DevTools endpoint, so the launch hangs.
    let fake_chrome = temp_dir.path().join("stalled-chrome");
    fs::write(&fake_chrome, "#!/bin/sh\nexec sleep 30\n").unwrap();
    fs::set_permissions(&fake_chrome, fs::Permissions::from_mode(0o755)).unwrap();

    let verify = VerifierConfig {
        chrome_executable: Some(fake_chrome),
        scenario_timeout_ms: 300,
        only: vec![ScenarioId::ExtensionLoad, ScenarioId::ArchivePresence],
        retries: Some(0),
        ..VerifierConfig::default()
    };
    let started = std::time::Instant::now();
    let report = run_suite(config.verify_target(temp_dir.path()), verify).await;

    assert!(started.elapsed() < Duration::from_secs(10));
    let load = report.outcome(ScenarioId::ExtensionLoad).unwrap();
    assert_eq!(load.status, Status::Failed);
    assert_eq!(
        load.message.as_deref(),
        Some("scenario extension-load timed out after 300ms")
    );
    assert_eq!(
        report.outcome(ScenarioId::ArchivePresence).unwrap().status,
        Status::Passed
    );
}
