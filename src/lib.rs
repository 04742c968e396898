//! Browser extension packager and smoke verifier
//!
//! Copies the declared parts of an extension source tree into a fresh output
//! directory, zips it, and then checks the result: structurally on disk and
//! behaviourally by loading it unpacked into headless Chromium.

pub mod config;
pub mod error;
pub mod models;
pub mod parser;
pub mod packager;
pub mod verifier;
pub mod report;
pub mod utils;

pub use config::{ExtpackConfig, PackagerConfig, VerifierConfig, VerifyTarget};
pub use error::{BuildError, ConfigError, VerifyError};
pub use models::{BuildResult, Manifest, ScenarioId, SuiteReport};
pub use packager::{package, package_with_progress};
pub use verifier::run_suite;

use std::path::Path;

/// Build the extension, then verify the fresh output.
///
/// The verifier only runs when the build succeeded.
pub async fn build_and_verify(
    config: &ExtpackConfig,
    source_root: &Path,
) -> Result<(BuildResult, SuiteReport), BuildError> {
    let build = package(&config.build, source_root)?;
    let report = run_suite(config.verify_target(source_root), config.verify.clone()).await;
    Ok((build, report))
}
