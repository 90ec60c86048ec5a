//! Human-readable and JSON rendering of batch results and checksum files.

use std::fmt::Write as _;

use anyhow::Result;
use rv_core::format_timestamp;
use rv_timeline::report::{GroupReport, ViewReport};
use rv_timeline::{Anchor, Part, TimelineReport};

use crate::batch::{BatchReport, JobOutcome, JobStatus};

/// Serialize the whole batch as JSON.
pub fn render_json(report: &BatchReport, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    Ok(json)
}

/// Plain-text summary of every job.
pub fn render_text(report: &BatchReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "recverify report ({}, {} job(s), {} failed)",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.jobs.len(),
        report.failed()
    );
    for job in &report.jobs {
        out.push('\n');
        render_job(&mut out, job);
    }
    out
}

fn render_job(out: &mut String, job: &JobOutcome) {
    match &job.status {
        JobStatus::Failed { error } => {
            let _ = writeln!(
                out,
                "{}: FAILED [{}] {}",
                job.input.display(),
                error.kind,
                error.message
            );
        }
        JobStatus::Reconciled { report } => {
            let _ = writeln!(
                out,
                "{}: {} capture(s), {} group(s), {} segment(s), {} gap(s), {} warning(s)",
                job.input.display(),
                report.parts.len(),
                report.groups.len(),
                report.canonical_segments,
                report.gaps,
                report.warnings.len()
            );
            render_timeline(out, report);
        }
    }
}

fn render_timeline(out: &mut String, report: &TimelineReport) {
    for part in &report.parts {
        let _ = writeln!(
            out,
            "  capture {:<24} {:>6} segment(s)  offset {:>6}  {}",
            part.name,
            part.segments,
            part.offset,
            describe_anchor(&part.anchor)
        );
    }
    for (i, group) in report.groups.iter().enumerate() {
        render_group(out, i, group);
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "  warning: {warning}");
    }
}

fn render_group(out: &mut String, index: usize, group: &GroupReport) {
    let _ = writeln!(
        out,
        "  group {index}: positions {}..{} ({} span(s))",
        group.canonical_start,
        group.canonical_end,
        group.spans.len()
    );
    for view in &group.selected {
        let _ = writeln!(out, "    use {}", describe_view(view));
    }
}

fn describe_anchor(anchor: &Anchor) -> String {
    match anchor {
        Anchor::Origin => "origin".to_string(),
        Anchor::Block {
            previous_start,
            current_start,
            len,
        } => format!("matched {len} segment(s) at {previous_start}/{current_start}"),
        Anchor::Appended => "appended after gap".to_string(),
    }
}

fn describe_view(view: &ViewReport) -> String {
    format!(
        "{} [{}-{}] segments {}..{}",
        view.part,
        view.time_start.as_deref().unwrap_or("--:--.---"),
        view.time_end.as_deref().unwrap_or("--:--.---"),
        view.start,
        view.end
    )
}

/// Per-capture summary of a checksum file, without reconciling it.
pub fn render_inspect(parts: &[Part]) -> String {
    let mut out = String::new();
    for part in parts {
        let range = match part.time_range() {
            Some((start, Some(end))) => {
                format!("{} - {}", format_timestamp(start), format_timestamp(end))
            }
            Some((start, None)) => format!("{} - open", format_timestamp(start)),
            None => "empty".to_string(),
        };
        let time_base = part
            .time_base()
            .iter()
            .map(|(kind, rate)| format!("{kind} {rate}"))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            out,
            "{}: {} segment(s), {}, time base {}",
            part.name(),
            part.len(),
            range,
            time_base
        );
    }
    out
}
