use crate::error::BatchResult;
use crate::query_set::QuerySet;
use crate::worker::Worker;
use futures::future::try_join_all;
use std::path::PathBuf;
use tracing::{error, info};

/// A worker paired with the file its responses are written to
#[derive(Debug)]
pub struct Job {
    pub worker: Worker,
    pub output: PathBuf,
}

impl Job {
    pub fn new(worker: Worker, output: impl Into<PathBuf>) -> Self {
        Self {
            worker,
            output: output.into(),
        }
    }
}

/// Outcome of one finished job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub worker_id: String,
    pub output: PathBuf,
    pub rows: usize,
}

/// Run every job against the shared query set at the same time
///
/// Each job invokes its worker and stores the result to its own file. Reports
/// come back in job order.
///
/// # Errors
///
/// The first job to fail ends the run; jobs still in flight are dropped and
/// may not have written their output.
pub async fn run_jobs(
    query_set: &QuerySet,
    jobs: &[Job],
    key_name: &str,
) -> BatchResult<Vec<JobReport>> {
    info!(
        "Running {} jobs over {} queries",
        jobs.len(),
        query_set.len()
    );

    let reports = try_join_all(jobs.iter().map(|job| run_job(query_set, job, key_name))).await?;

    info!("All {} jobs completed", reports.len());
    Ok(reports)
}

async fn run_job(query_set: &QuerySet, job: &Job, key_name: &str) -> BatchResult<JobReport> {
    let worker_id = job.worker.id();

    let result = match job.worker.invoke_with_key(query_set, key_name).await {
        Ok(result) => result,
        Err(e) => {
            error!("Job {} failed: {e}", worker_id);
            return Err(e);
        }
    };

    // Overwrites whatever is at the output path
    if let Err(e) = result.store_to(&job.output) {
        error!("Job {} could not write {}: {e}", worker_id, job.output.display());
        return Err(e);
    }

    info!(
        "Job {} completed: {} rows written to {}",
        worker_id,
        result.len(),
        job.output.display()
    );

    Ok(JobReport {
        worker_id: worker_id.to_string(),
        output: job.output.clone(),
        rows: result.len(),
    })
}
