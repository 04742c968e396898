//! Scoped headless browser sessions with the extension loaded unpacked

use crate::error::VerifyError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// True when the page can see the extension runtime binding.
pub const RUNTIME_PROBE: &str =
    "typeof window.chrome !== 'undefined' && typeof window.chrome.runtime !== 'undefined'";

/// How sessions are launched; shared by every scenario of a run.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub chrome_executable: Option<PathBuf>,
    pub extra_args: Vec<String>,
    pub no_sandbox: bool,
    pub assertion_timeout: Duration,
}

/// Chromium flags that load `extension_dir` as the only unpacked extension.
pub fn extension_args(extension_dir: &Path) -> Vec<String> {
    let dir = extension_dir.display();
    vec![
        "--headless=new".to_string(),
        format!("--disable-extensions-except={}", dir),
        format!("--load-extension={}", dir),
        "--disable-background-networking".to_string(),
        "--disable-client-side-phishing-detection".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--mute-audio".to_string(),
    ]
}

/// One browser process with a throwaway profile and one page.
///
/// Call [`BrowserSession::release`] on every normal exit path. If the owning
/// future is dropped instead (a scenario timeout), `Drop` still kills the
/// process and deletes the profile.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    assertion_timeout: Duration,
    // Dropped last so the profile outlives the process using it.
    _profile: TempDir,
}

impl BrowserSession {
    pub async fn acquire(
        extension_dir: &Path,
        settings: &SessionSettings,
    ) -> Result<Self, VerifyError> {
        let extension_dir = extension_dir.canonicalize().map_err(|err| {
            VerifyError::SessionAcquisition(format!(
                "extension directory {} is not accessible: {}",
                extension_dir.display(),
                err
            ))
        })?;

        let profile = tempfile::Builder::new()
            .prefix("extpack-profile-")
            .tempdir()
            .map_err(|err| {
                VerifyError::SessionAcquisition(format!("failed to create browser profile: {}", err))
            })?;

        // chromiumoxide's default flags include --disable-extensions
        let mut builder = BrowserConfig::builder()
            .with_head()
            .disable_default_args()
            .user_data_dir(profile.path())
            .request_timeout(settings.assertion_timeout)
            .args(extension_args(&extension_dir))
            .args(settings.extra_args.iter().cloned());
        if let Some(executable) = &settings.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        if settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder.build().map_err(VerifyError::SessionAcquisition)?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|err| VerifyError::SessionAcquisition(err.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(err) = event {
                    tracing::debug!(error = %err, "browser handler event failed");
                }
            }
        });

        tracing::debug!(
            extension = %extension_dir.display(),
            profile = %profile.path().display(),
            "browser session acquired"
        );

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler.abort();
                return Err(VerifyError::SessionAcquisition(format!(
                    "failed to open a page: {}",
                    err
                )));
            }
        };

        Ok(Self {
            browser,
            page,
            handler,
            assertion_timeout: settings.assertion_timeout,
            _profile: profile,
        })
    }

    /// Bound a single browser interaction by the assertion timeout.
    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, VerifyError>
    where
        F: Future<Output = Result<T, chromiumoxide::error::CdpError>>,
    {
        within(self.assertion_timeout, what, fut).await
    }

    pub async fn goto(&self, url: &str) -> Result<(), VerifyError> {
        let what = format!("navigation to {}", url);
        self.bounded(&what, async { self.page.goto(url).await.map(|_| ()) })
            .await
    }

    /// Evaluate [`RUNTIME_PROBE`] on the current page.
    pub async fn probe_runtime(&self) -> Result<bool, VerifyError> {
        let result = self
            .bounded("runtime probe", self.page.evaluate(RUNTIME_PROBE))
            .await?;
        result.into_value::<bool>().map_err(|err| {
            VerifyError::assertion(format!("runtime probe returned a non-boolean: {}", err))
        })
    }

    /// Wait without touching the page, like a fixed settle delay in a UI test.
    pub async fn settle(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }

    /// Whether the browser still answers protocol requests.
    pub async fn is_alive(&self) -> bool {
        self.bounded("liveness check", self.browser.version())
            .await
            .is_ok()
    }

    /// Close the browser and wait for the process to exit.
    pub async fn release(mut self) {
        if let Err(err) = self.browser.close().await {
            tracing::warn!(error = %err, "browser did not close cleanly");
        }
        if let Err(err) = self.browser.wait().await {
            tracing::warn!(error = %err, "failed to reap browser process");
        }
        self.handler.abort();
        tracing::debug!("browser session released");
    }
}

async fn within<T, F>(limit: Duration, what: &str, fut: F) -> Result<T, VerifyError>
where
    F: Future<Output = Result<T, chromiumoxide::error::CdpError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(VerifyError::from),
        Err(_) => Err(VerifyError::Timeout {
            what: what.to_string(),
            after: limit,
        }),
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Browser's own Drop kills the child process.
        self.handler.abort();
    }
}
