use anyhow::{Context, Result};
use clap::Parser;
use querybatch::config::Config;
use querybatch::{run_jobs, HttpCompletionClient, Job, QuerySet, RequestParams, Worker};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Provider credentials usually live in ./.env
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let config = Config::parse();

    // Initialize tracing subscriber
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_new(&config.log_level)?)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("querybatch v{} starting...", env!("CARGO_PKG_VERSION"));

    config.validate()?;

    if let Some(path) = &config.env_file {
        dotenvy::from_path(path)
            .with_context(|| format!("Failed to load env file {}", path.display()))?;
    }

    let query_set = match &config.input {
        Some(path) => QuerySet::from_path(path, &config.key)?,
        None => QuerySet::from_list(config.queries.iter().cloned()),
    };

    let client = Arc::new(match config.request_timeout_duration() {
        Some(timeout) => HttpCompletionClient::with_timeout(timeout)?,
        None => HttpCompletionClient::new(),
    });

    // Endpoint and credential are resolved now but only checked when each job runs
    let jobs: Vec<Job> = config
        .jobs
        .iter()
        .map(|spec| {
            let params =
                RequestParams::from_env(&spec.provider, spec.model.clone().unwrap_or_default());
            let worker =
                Worker::with_client(params, client.clone()).with_id(spec.worker_id());
            Job::new(worker, spec.output.clone())
        })
        .collect();

    let reports = run_jobs(&query_set, &jobs, &config.key).await?;

    for report in &reports {
        info!(
            "{}: {} rows -> {}",
            report.worker_id,
            report.rows,
            report.output.display()
        );
    }

    Ok(())
}
