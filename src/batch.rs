//! Batch reconciliation of several checksum files.
//!
//! Each input file is one independent job. Jobs run on a dedicated rayon pool
//! and never affect each other: a failing job is recorded and the rest carry
//! on.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use rv_core::ReconcileConfig;
use rv_timeline::{load_parts_from_path, reconcile, TimelineReport};

/// Why a job did not produce a timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobError {
    pub kind: String,
    pub message: String,
    pub exit_code: i32,
}

impl From<&rv_core::Error> for JobError {
    fn from(err: &rv_core::Error) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            exit_code: err.exit_code(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Reconciled { report: TimelineReport },
    Failed { error: JobError },
}

/// Result of reconciling one checksum file.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub input: PathBuf,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub status: JobStatus,
}

impl JobOutcome {
    pub fn report(&self) -> Option<&TimelineReport> {
        match &self.status {
            JobStatus::Reconciled { report } => Some(report),
            JobStatus::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&JobError> {
        match &self.status {
            JobStatus::Reconciled { .. } => None,
            JobStatus::Failed { error } => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error().is_none()
    }
}

/// Every job's outcome, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub workers: usize,
    pub jobs: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.jobs.iter().filter(|j| !j.is_success()).count()
    }

    /// Process exit code: 0 when every job succeeded, otherwise the code of
    /// the first failed job.
    pub fn exit_code(&self) -> i32 {
        self.jobs
            .iter()
            .find_map(|j| j.error().map(|e| e.exit_code))
            .unwrap_or(0)
    }
}

/// Reconcile a single checksum file.
pub fn run_job(input: &Path, config: &ReconcileConfig) -> JobOutcome {
    let started = Instant::now();
    tracing::debug!("Reconciling {:?}", input);

    let result = load_parts_from_path(input).and_then(|parts| reconcile(parts, config));
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let status = match result {
        Ok(timeline) => {
            tracing::info!(
                "{:?}: {} group(s), {} warning(s) in {}ms",
                input,
                timeline.groups().len(),
                timeline.warnings().len(),
                elapsed_ms
            );
            JobStatus::Reconciled {
                report: timeline.report(),
            }
        }
        Err(e) => {
            tracing::error!("{:?}: {}", input, e);
            JobStatus::Failed {
                error: JobError::from(&e),
            }
        }
    };

    JobOutcome {
        input: input.to_path_buf(),
        elapsed_ms,
        status,
    }
}

/// Reconcile every file in `inputs` on a pool of `workers` threads.
pub fn run_batch(inputs: &[PathBuf], config: &ReconcileConfig, workers: usize) -> Result<BatchReport> {
    let workers = workers.clamp(1, inputs.len().max(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("recverify-worker-{i}"))
        .build()
        .context("Failed to start batch worker pool")?;

    tracing::info!("Reconciling {} file(s) with {} worker(s)", inputs.len(), workers);

    let jobs: Vec<JobOutcome> =
        pool.install(|| inputs.par_iter().map(|p| run_job(p, config)).collect());

    Ok(BatchReport {
        generated_at: Utc::now(),
        workers,
        jobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn checksum_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    const ONE_PART: &str = r#"[{
        "name": "a.flv",
        "time_base": {"video": 0.001, "audio": 0.001},
        "data": [
            {"start_pts": 0, "end_pts": 1960, "frames": {"video": 50, "audio": 94},
             "keyframe_md5": "00", "segment_md5": {"video": "0a", "audio": "0b"}},
            {"start_pts": 2000, "end_pts": 3960, "frames": {"video": 50, "audio": 94},
             "keyframe_md5": "01", "segment_md5": {"video": "1a", "audio": "1b"}}
        ]
    }]"#;

    #[test]
    fn job_success_carries_report() {
        let file = checksum_file(ONE_PART);
        let outcome = run_job(file.path(), &ReconcileConfig::default());
        assert!(outcome.is_success());
        let report = outcome.report().unwrap();
        assert_eq!(report.canonical_segments, 2);
    }

    #[test]
    fn job_failure_carries_kind_and_code() {
        let file = checksum_file("{ not json");
        let outcome = run_job(file.path(), &ReconcileConfig::default());
        let error = outcome.error().unwrap();
        assert_eq!(error.kind, "parse");
        assert_eq!(error.exit_code, 2);
    }

    #[test]
    fn batch_keeps_input_order_and_isolates_failures() {
        let good = checksum_file(ONE_PART);
        let bad = checksum_file("[]");
        let inputs = vec![
            good.path().to_path_buf(),
            bad.path().to_path_buf(),
            good.path().to_path_buf(),
        ];
        let report = run_batch(&inputs, &ReconcileConfig::default(), 4).unwrap();

        assert_eq!(report.workers, 3);
        let inputs_back: Vec<_> = report.jobs.iter().map(|j| j.input.clone()).collect();
        assert_eq!(inputs_back, inputs);
        assert!(report.jobs[0].is_success());
        assert!(!report.jobs[1].is_success());
        assert!(report.jobs[2].is_success());
        assert_eq!(report.failed(), 1);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn job_outcome_serializes_with_status_tag() {
        let file = checksum_file(ONE_PART);
        let outcome = run_job(file.path(), &ReconcileConfig::default());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "reconciled");
        assert_eq!(json["report"]["canonical_segments"], 2);
    }
}
