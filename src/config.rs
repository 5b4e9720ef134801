use crate::query_set::DEFAULT_KEY_NAME;
use clap::Parser;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Provider names double as environment variable prefixes
static PROVIDER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("provider name pattern is valid"));

/// Maximum length for a provider name
const MAX_PROVIDER_LEN: usize = 64;

/// querybatch - send a batch of queries to chat-completion endpoints
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Input file with one query per row (csv, tsv, xlsx, xlsm, xls, ods)
    #[arg(short = 'i', long, env = "QUERYBATCH_INPUT", conflicts_with = "queries")]
    pub input: Option<PathBuf>,

    /// Query text given directly; repeat for several queries
    #[arg(short = 'q', long = "query", value_name = "TEXT")]
    pub queries: Vec<String>,

    /// Column holding the queries in the input file
    #[arg(short = 'k', long, env = "QUERYBATCH_KEY", default_value = DEFAULT_KEY_NAME)]
    pub key: String,

    /// Provider job: endpoint and key come from <PROVIDER>_BASE_URL and
    /// <PROVIDER>_API_KEY; repeat to run several providers at once
    #[arg(
        short = 'j',
        long = "job",
        value_name = "PROVIDER:MODEL:OUTPUT",
        required = true
    )]
    pub jobs: Vec<JobSpec>,

    /// Extra env file loaded before providers are resolved
    #[arg(long, env = "QUERYBATCH_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Per-request timeout in seconds (no timeout when unset)
    #[arg(long, env = "QUERYBATCH_REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,

    /// Log filter, e.g. "info" or "querybatch=debug"
    #[arg(long, env = "QUERYBATCH_LOG", default_value = "info")]
    pub log_level: String,
}

/// One `PROVIDER:MODEL:OUTPUT` job description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub provider: String,
    pub model: Option<String>,
    pub output: PathBuf,
}

impl FromStr for JobSpec {
    type Err = String;

    /// The provider ends at the first ':' and the output starts after the
    /// last one, so model names may contain ':' themselves
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("'{s}' is not in PROVIDER:MODEL:OUTPUT form"))?;
        let (model, output) = rest
            .rsplit_once(':')
            .ok_or_else(|| format!("'{s}' is not in PROVIDER:MODEL:OUTPUT form"))?;

        validate_provider_name(provider).map_err(|e| e.to_string())?;
        if output.trim().is_empty() {
            return Err(format!("'{s}' has an empty output path"));
        }

        // An empty model is carried through and reported when the job runs
        let model = Some(model.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Ok(Self {
            provider: provider.to_string(),
            model,
            output: PathBuf::from(output.trim()),
        })
    }
}

impl JobSpec {
    /// `provider:model`, or just the provider when no model was given
    #[must_use]
    pub fn worker_id(&self) -> String {
        match &self.model {
            Some(model) => format!("{}:{model}", self.provider),
            None => self.provider.clone(),
        }
    }
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        // Exactly one query source
        if self.input.is_none() && self.queries.is_empty() {
            anyhow::bail!("Either --input or at least one --query must be given");
        }

        if self.key.trim().is_empty() {
            anyhow::bail!("Key column name cannot be empty");
        }

        if self.jobs.is_empty() {
            anyhow::bail!("At least one --job must be given");
        }

        // Every job writes its own file
        let mut outputs = HashSet::new();
        for job in &self.jobs {
            if !outputs.insert(job.output.clone()) {
                anyhow::bail!(
                    "Output '{}' is used by more than one job",
                    job.output.display()
                );
            }
        }

        if self.request_timeout == Some(0) {
            anyhow::bail!("Request timeout must be greater than 0");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout_duration(&self) -> Option<Duration> {
        self.request_timeout.map(Duration::from_secs)
    }
}

/// Validate provider name format
pub fn validate_provider_name(name: &str) -> anyhow::Result<()> {
    if name.is_empty() {
        anyhow::bail!("Provider name cannot be empty");
    }

    if name.len() > MAX_PROVIDER_LEN {
        anyhow::bail!("Provider name cannot exceed {MAX_PROVIDER_LEN} characters");
    }

    if !PROVIDER_NAME.is_match(name) {
        anyhow::bail!(
            "Provider name must start with a letter and contain only letters, digits, and underscores"
        );
    }

    Ok(())
}
