//! Smoke verification of a built extension
//!
//! Each scenario is independent: it opens its own browser session when it
//! needs one, and a failure is recorded against that scenario only. Scenarios
//! run in declaration order, one at a time unless the configuration asks for
//! parallel execution.

pub mod checks;
pub mod scenarios;
pub mod session;

pub use session::{BrowserSession, SessionSettings};

use crate::config::{ExecutionMode, VerifierConfig, VerifyTarget};
use crate::error::VerifyError;
use crate::models::{ScenarioId, ScenarioOutcome, Status, SuiteReport};
use futures::{stream, StreamExt};
use std::time::Instant;

/// Progress notifications emitted while the suite runs.
#[derive(Debug, Clone, Copy)]
pub enum SuiteEvent<'a> {
    Started(ScenarioId),
    Retrying { id: ScenarioId, attempt: u32, error: &'a VerifyError },
    Finished(&'a ScenarioOutcome),
}

/// Everything a scenario may look at.
pub struct SuiteContext {
    pub target: VerifyTarget,
    pub config: VerifierConfig,
    pub session: SessionSettings,
    pub retries: u32,
}

impl SuiteContext {
    pub fn new(target: VerifyTarget, config: VerifierConfig) -> Self {
        let session = SessionSettings {
            chrome_executable: config.chrome_executable.clone(),
            extra_args: config.extra_args.clone(),
            no_sandbox: config.no_sandbox,
            assertion_timeout: config.assertion_timeout(),
        };
        let retries = config.effective_retries();
        Self {
            target,
            config,
            session,
            retries,
        }
    }
}

/// Run every selected scenario against `target`.
pub async fn run_suite(target: VerifyTarget, config: VerifierConfig) -> SuiteReport {
    run_suite_with_progress(SuiteContext::new(target, config), &|_| {}).await
}

pub async fn run_suite_with_progress(
    ctx: SuiteContext,
    on_event: &(dyn Fn(SuiteEvent<'_>) + Sync),
) -> SuiteReport {
    let started = Instant::now();
    let selected = ctx.config.selected_scenarios();

    tracing::info!(
        extension = %ctx.target.extension_dir.display(),
        scenarios = selected.len(),
        mode = ?ctx.config.execution,
        retries = ctx.retries,
        "running verification suite"
    );

    let outcomes = match ctx.config.execution {
        ExecutionMode::Sequential => {
            let mut outcomes = Vec::with_capacity(selected.len());
            for id in selected {
                outcomes.push(run_with_retries(id, &ctx, on_event).await);
            }
            outcomes
        }
        ExecutionMode::Parallel => {
            // `buffered` keeps outcomes in declaration order
            stream::iter(selected)
                .map(|id| run_with_retries(id, &ctx, on_event))
                .buffered(ctx.config.max_parallel.max(1))
                .collect::<Vec<_>>()
                .await
        }
    };

    SuiteReport {
        extension_dir: ctx.target.extension_dir.clone(),
        outcomes,
        duration_ms: elapsed_ms(started),
    }
}

async fn run_with_retries(
    id: ScenarioId,
    ctx: &SuiteContext,
    on_event: &(dyn Fn(SuiteEvent<'_>) + Sync),
) -> ScenarioOutcome {
    on_event(SuiteEvent::Started(id));
    tracing::info!(scenario = %id, "scenario started");

    let started = Instant::now();
    let mut attempts = 0;
    let result = loop {
        attempts += 1;
        match run_bounded(id, ctx).await {
            Ok(observations) => break Ok(observations),
            Err(err) if attempts <= ctx.retries => {
                tracing::warn!(scenario = %id, attempt = attempts, error = %err, "scenario failed, retrying");
                on_event(SuiteEvent::Retrying { id, attempt: attempts, error: &err });
            }
            Err(err) => break Err(err),
        }
    };

    let outcome = match result {
        Ok(observations) => ScenarioOutcome {
            id,
            title: id.title().to_string(),
            status: Status::Passed,
            attempts,
            duration_ms: elapsed_ms(started),
            message: None,
            observations,
        },
        Err(err) => ScenarioOutcome {
            id,
            title: id.title().to_string(),
            status: Status::Failed,
            attempts,
            duration_ms: elapsed_ms(started),
            message: Some(err.to_string()),
            observations: Vec::new(),
        },
    };

    tracing::info!(scenario = %id, status = ?outcome.status, attempts, "scenario finished");
    on_event(SuiteEvent::Finished(&outcome));
    outcome
}

/// One attempt, bounded by the per-scenario timeout.
async fn run_bounded(
    id: ScenarioId,
    ctx: &SuiteContext,
) -> Result<Vec<crate::models::Observation>, VerifyError> {
    let limit = ctx.config.scenario_timeout();
    match tokio::time::timeout(limit, scenarios::run(id, ctx)).await {
        Ok(result) => result,
        Err(_) => Err(VerifyError::Timeout {
            what: format!("scenario {}", id),
            after: limit,
        }),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn file_only_config() -> VerifierConfig {
        VerifierConfig {
            only: vec![ScenarioId::BuildCompleteness, ScenarioId::ArchivePresence],
            retries: Some(1),
            ..VerifierConfig::default()
        }
    }

    #[tokio::test]
    async fn test_failed_scenarios_are_retried_then_reported() {
        let target = VerifyTarget {
            extension_dir: PathBuf::from("/nonexistent/extpack/dist"),
            archive_name: "extension.zip".to_string(),
        };
        let events = Mutex::new(Vec::new());
        let report = run_suite_with_progress(
            SuiteContext::new(target, file_only_config()),
            &|event| {
                let line = match event {
                    SuiteEvent::Started(id) => format!("start {id}"),
                    SuiteEvent::Retrying { id, attempt, .. } => format!("retry {id} {attempt}"),
                    SuiteEvent::Finished(outcome) => format!("done {}", outcome.id),
                };
                events.lock().unwrap().push(line);
            },
        )
        .await;

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.failed_count(), 2);
        assert!(report.outcomes.iter().all(|o| o.attempts == 2));
        assert_eq!(
            events.into_inner().unwrap(),
            vec![
                "start build-completeness",
                "retry build-completeness 1",
                "done build-completeness",
                "start archive-presence",
                "retry archive-presence 1",
                "done archive-presence",
            ]
        );
    }

    #[tokio::test]
    async fn test_parallel_mode_keeps_declaration_order() {
        let target = VerifyTarget {
            extension_dir: PathBuf::from("/nonexistent/extpack/dist"),
            archive_name: "extension.zip".to_string(),
        };
        let config = VerifierConfig {
            execution: ExecutionMode::Parallel,
            max_parallel: 4,
            retries: Some(0),
            only: vec![
                ScenarioId::IconPresence,
                ScenarioId::BuildCompleteness,
                ScenarioId::ArchivePresence,
            ],
            ..VerifierConfig::default()
        };

        let report = run_suite(target, config).await;
        let ids: Vec<_> = report.outcomes.iter().map(|o| o.id).collect();
        assert_eq!(
            ids,
            vec![
                ScenarioId::BuildCompleteness,
                ScenarioId::ArchivePresence,
                ScenarioId::IconPresence,
            ]
        );
    }
}
