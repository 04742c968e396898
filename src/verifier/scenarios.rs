//! The individual verification scenarios

use super::checks;
use super::session::BrowserSession;
use super::SuiteContext;
use crate::config::ProbeMode;
use crate::error::VerifyError;
use crate::models::{Observation, ScenarioId};
use std::time::Duration;

/// Run one attempt of a scenario.
pub(crate) async fn run(id: ScenarioId, ctx: &SuiteContext) -> Result<Vec<Observation>, VerifyError> {
    let target = &ctx.target;
    match id {
        ScenarioId::ExtensionLoad => extension_load(ctx).await,
        ScenarioId::PopupReachability => popup_reachability(ctx).await,
        ScenarioId::ContentScriptInjection => content_script_injection(ctx).await,
        ScenarioId::BuildCompleteness => {
            checks::build_completeness(&target.extension_dir, &ctx.config.required_files)?;
            Ok(Vec::new())
        }
        ScenarioId::ArchivePresence => Ok(vec![checks::archive_presence(&target.archive_path())?]),
        ScenarioId::BackgroundRegistration => {
            let manifest = checks::load_manifest(&target.extension_dir)?;
            Ok(vec![checks::background_registration(&manifest)?])
        }
        ScenarioId::ContentScriptRegistration => {
            let manifest = checks::load_manifest(&target.extension_dir)?;
            Ok(vec![checks::content_script_registration(&manifest)?])
        }
        ScenarioId::IconPresence => {
            let icons = target.extension_dir.join(&ctx.config.icons_dir);
            Ok(vec![checks::icon_presence(&icons)?])
        }
    }
}

async fn extension_load(ctx: &SuiteContext) -> Result<Vec<Observation>, VerifyError> {
    let session = BrowserSession::acquire(&ctx.target.extension_dir, &ctx.session).await?;

    let outcome = async {
        session.goto("about:blank").await?;
        let available = session.probe_runtime().await?;
        judge_probe(ctx.config.probe, "runtime binding on about:blank", available)
    }
    .await;

    session.release().await;
    outcome
}

async fn popup_reachability(ctx: &SuiteContext) -> Result<Vec<Observation>, VerifyError> {
    let session = BrowserSession::acquire(&ctx.target.extension_dir, &ctx.session).await?;

    let outcome = async {
        session.goto("about:blank").await?;
        session
            .settle(Duration::from_millis(ctx.config.popup_settle_ms))
            .await;
        if !session.is_alive().await {
            return Err(VerifyError::assertion(
                "browser did not survive the settle delay with the extension loaded",
            ));
        }

        let manifest = checks::load_manifest(&ctx.target.extension_dir)?;
        checks::manifest_identity(&manifest)?;
        Ok(vec![Observation::new(
            "name",
            manifest.get("name").cloned().unwrap_or_default(),
        )])
    }
    .await;

    session.release().await;
    outcome
}

async fn content_script_injection(ctx: &SuiteContext) -> Result<Vec<Observation>, VerifyError> {
    let session = BrowserSession::acquire(&ctx.target.extension_dir, &ctx.session).await?;

    let outcome = async {
        session.goto(&ctx.config.content_url).await?;
        session
            .settle(Duration::from_millis(ctx.config.content_settle_ms))
            .await;
        let available = session.probe_runtime().await?;
        let label = format!("runtime binding on {}", ctx.config.content_url);
        judge_probe(ctx.config.probe, &label, available)
    }
    .await;

    session.release().await;
    outcome
}

/// Record a probe value and, in strict mode, require it to be true.
pub(crate) fn judge_probe(
    mode: ProbeMode,
    label: &str,
    value: bool,
) -> Result<Vec<Observation>, VerifyError> {
    tracing::debug!(probe = label, value, ?mode, "probe evaluated");
    match mode {
        ProbeMode::Strict if !value => Err(VerifyError::assertion(format!(
            "{} was not available",
            label
        ))),
        _ => Ok(vec![Observation::new(label, value)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_probe_requires_true() {
        assert!(judge_probe(ProbeMode::Strict, "probe", true).is_ok());
        let err = judge_probe(ProbeMode::Strict, "probe", false).unwrap_err();
        assert_eq!(err.to_string(), "assertion failed: probe was not available");
    }

    #[test]
    fn test_observe_probe_records_value() {
        let observed = judge_probe(ProbeMode::Observe, "probe", false).unwrap();
        assert_eq!(observed, vec![Observation::new("probe", false)]);
    }
}
