// Public exports for library usage
pub mod client;
pub mod config;
pub mod error;
pub mod params;
pub mod query_set;
pub mod response_set;
pub mod runner;
pub mod worker;

pub use client::{CompletionClient, HttpCompletionClient};
pub use error::{BatchError, BatchResult};
pub use params::RequestParams;
pub use query_set::{QuerySet, DEFAULT_KEY_NAME};
pub use response_set::{ResponseRecord, ResponseSet};
pub use runner::{run_jobs, Job, JobReport};
pub use worker::Worker;
