//! Report rendering

use anyhow::Result;
use clap::ValueEnum;
use stackctl_core::{ProbeRole, RunReport};
use std::fmt::Write;

/// How the run report is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Ordered tables and a one-line verdict
    Text,
    /// The full report as JSON
    Json,
}

/// Print the report on stdout
pub fn render(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_text(report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn render_text(report: &RunReport) -> String {
    let mut out = String::new();

    // writing to a String cannot fail
    let _ = writeln!(out, "Mode: {} ({})", report.mode, report.environment);
    let _ = writeln!(out, "Confirmation: {}", report.confirmation);

    if !report.outcomes.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<45} {:<14} {:<9} {}",
            "RESOURCE", "STATUS", "ATTEMPTS", "MESSAGE"
        );
        let _ = writeln!(out, "{}", "-".repeat(100));
        for outcome in &report.outcomes {
            let _ = writeln!(
                out,
                "{:<45} {:<14} {:<9} {}",
                outcome.resource,
                outcome.status.to_string(),
                outcome.attempts,
                outcome.message
            );
        }
    }

    if !report.probes.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<45} {:<10} {:<8} {:<9} {}",
            "PROBE", "ROLE", "HEALTHY", "ATTEMPTS", "DETAIL"
        );
        let _ = writeln!(out, "{}", "-".repeat(100));
        for probe in &report.probes {
            let role = match probe.role {
                ProbeRole::Primary => "primary",
                ProbeRole::Auxiliary => "auxiliary",
            };
            let _ = writeln!(
                out,
                "{:<45} {:<10} {:<8} {:<9} {}",
                probe.target,
                role,
                if probe.healthy { "yes" } else { "no" },
                probe.attempts,
                probe.error_detail.as_deref().unwrap_or("")
            );
        }
    }

    if !report.observations.is_empty() {
        let _ = writeln!(out);
        for observation in &report.observations {
            let marker = if observation.healthy { "ok" } else { "!!" };
            let _ = writeln!(
                out,
                "[{}] {}: {}",
                marker, observation.subject, observation.detail
            );
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Verdict: {}", report.summary());
    out
}
