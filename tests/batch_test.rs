//! Integration tests for batch reconciliation through the library API.

mod common;

use assert_matches::assert_matches;
use common::{capture, Fixtures};
use recverify::batch::{run_batch, JobStatus};
use recverify::output::{render_json, render_text};
use rv_core::{GapPolicy, ReconcileConfig};

#[test]
fn many_jobs_keep_input_order() {
    let fixtures = Fixtures::new();
    let inputs: Vec<_> = (0..12)
        .map(|i| {
            let start = i as u32;
            fixtures.write(
                &format!("job-{i:02}.json"),
                vec![capture("a.flv", start..start + 6), capture("b.flv", start + 3..start + 9)],
            )
        })
        .collect();

    let report = run_batch(&inputs, &ReconcileConfig::default(), 4).unwrap();
    assert_eq!(report.workers, 4);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.exit_code(), 0);

    for (job, input) in report.jobs.iter().zip(&inputs) {
        assert_eq!(&job.input, input);
        let timeline = job.report().unwrap();
        assert_eq!(timeline.canonical_segments, 9);
        assert_eq!(timeline.parts[1].offset, 3);
    }
}

#[test]
fn failures_are_isolated_and_classified() {
    let fixtures = Fixtures::new();
    let inputs = vec![
        fixtures.diverged(),
        fixtures.clean(),
        fixtures.disjoint(),
        fixtures.write_raw("garbage.json", "not a checksum file"),
    ];

    let report = run_batch(&inputs, &ReconcileConfig::default(), 2).unwrap();
    let kinds: Vec<&str> = report
        .jobs
        .iter()
        .map(|j| match &j.status {
            JobStatus::Reconciled { .. } => "ok",
            JobStatus::Failed { error } => error.kind.as_str(),
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["hash_check_difference", "ok", "alignment_failure", "parse"]
    );
    assert_matches!(
        report.jobs[0].status,
        JobStatus::Failed { ref error } if error.message.contains("00:04.000")
    );
    assert_eq!(report.failed(), 3);
    assert_eq!(report.exit_code(), 4);

    let text = render_text(&report);
    assert!(text.contains("4 job(s), 3 failed"));
}

#[test]
fn gap_policy_applies_to_every_job() {
    let fixtures = Fixtures::new();
    let inputs = vec![fixtures.disjoint(), fixtures.disjoint()];
    let config = ReconcileConfig {
        gap_policy: GapPolicy::Append,
        ..Default::default()
    };

    let report = run_batch(&inputs, &config, 8).unwrap();
    assert_eq!(report.workers, 2);
    for job in &report.jobs {
        let timeline = job.report().unwrap();
        assert_eq!(timeline.gaps, 1);
        assert_eq!(timeline.groups.len(), 2);
    }

    let json: serde_json::Value =
        serde_json::from_str(&render_json(&report, true).unwrap()).unwrap();
    assert_eq!(json["jobs"][1]["report"]["parts"][1]["anchor"]["kind"], "appended");
}

#[test]
fn tail_corruption_is_a_warning_not_a_failure() {
    let fixtures = Fixtures::new();
    let mut truncated = capture("a.flv", 0..5);
    truncated["data"][4]["segment_md5"]["video"] =
        serde_json::json!("0123456789abcdef0123456789abcdef");
    truncated["data"][4]["frames"]["video"] = serde_json::json!(12);
    let input = fixtures.write(
        "tail.json",
        vec![truncated, capture("b.flv", 0..5), capture("c.flv", 0..5)],
    );

    let report = run_batch(&[input], &ReconcileConfig::default(), 1).unwrap();
    let timeline = report.jobs[0].report().unwrap();
    assert_eq!(timeline.warnings.len(), 1);
    assert_eq!(timeline.warnings[0].chosen, "b.flv");
    assert_eq!(timeline.groups[0].spans[0].authoritative.part, "b.flv");
    assert!(render_text(&report).contains("warning: video tail mismatch at 00:08.000"));
}
