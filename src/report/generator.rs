//! Report generation

use crate::models::{Status, SuiteReport};
use anyhow::{Context, Result};

pub fn generate_markdown_report(report: &SuiteReport) -> String {
    let mut out = String::new();

    out.push_str("# Extension Verification Report\n\n");

    out.push_str("## Summary\n\n");
    out.push_str(&format!("- **Extension**: `{}`\n", report.extension_dir.display()));
    out.push_str(&format!(
        "- **Result**: {}\n",
        if report.all_passed() { "✅ Passed" } else { "❌ Failed" }
    ));
    out.push_str(&format!("- **Scenarios passed**: {}\n", report.passed_count()));
    out.push_str(&format!("- **Scenarios failed**: {}\n", report.failed_count()));
    out.push_str(&format!("- **Duration**: {} ms\n\n", report.duration_ms));

    out.push_str("## Scenarios\n\n");
    out.push_str("| Scenario | Status | Attempts | Duration |\n");
    out.push_str("|---|---|---|---|\n");
    for outcome in &report.outcomes {
        let status = match outcome.status {
            Status::Passed => "✅ passed",
            Status::Failed => "❌ failed",
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} ms |\n",
            outcome.title, status, outcome.attempts, outcome.duration_ms
        ));
    }
    out.push('\n');

    let failures: Vec<_> = report.outcomes.iter().filter(|o| !o.passed()).collect();
    if !failures.is_empty() {
        out.push_str("## ⛔ Failures\n\n");
        for outcome in failures {
            out.push_str(&format!(
                "- **{}** (`{}`): {}\n",
                outcome.title,
                outcome.id,
                outcome.message.as_deref().unwrap_or("no message")
            ));
        }
        out.push('\n');
    }

    let observed: Vec<_> = report
        .outcomes
        .iter()
        .flat_map(|o| o.observations.iter().map(move |obs| (o.id, obs)))
        .collect();
    if !observed.is_empty() {
        out.push_str("## Observations\n\n");
        for (id, observation) in observed {
            out.push_str(&format!("- `{}` {}: `{}`\n", id, observation.label, observation.value));
        }
        out.push('\n');
    }

    out
}

pub fn generate_json_report(report: &SuiteReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize verification report")
}
