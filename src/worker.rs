use crate::client::{CompletionClient, HttpCompletionClient};
use crate::error::BatchResult;
use crate::params::RequestParams;
use crate::query_set::{QuerySet, DEFAULT_KEY_NAME};
use crate::response_set::{ResponseRecord, ResponseSet};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Turns a [`QuerySet`] into a [`ResponseSet`] against one provider profile
///
/// A worker is reusable: each call to [`Worker::invoke`] issues a fresh round
/// of requests.
pub struct Worker {
    id: String,
    params: RequestParams,
    client: Arc<dyn CompletionClient>,
}

impl Worker {
    /// Create a worker that talks to the endpoint over HTTP
    pub fn new(params: RequestParams) -> Self {
        Self::with_client(params, Arc::new(HttpCompletionClient::new()))
    }

    /// Create a worker around any completion client
    pub fn with_client(params: RequestParams, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            id: format!("worker-{}", Uuid::new_v4()),
            params,
            client,
        }
    }

    /// Replace the generated worker ID, e.g. with the provider name
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn params(&self) -> &RequestParams {
        &self.params
    }

    /// Answer every query, labelling the query column `"query"`
    ///
    /// # Errors
    ///
    /// See [`Worker::invoke_with_key`]
    pub async fn invoke(&self, query_set: &QuerySet) -> BatchResult<ResponseSet> {
        self.invoke_with_key(query_set, DEFAULT_KEY_NAME).await
    }

    /// Answer every query concurrently and pair each answer with its query
    ///
    /// All requests are in flight at once on the current task. Results are
    /// matched by position, so the output order is the input order no matter
    /// which response arrives first.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Config`] before any request is sent if the
    /// parameters are incomplete. Otherwise the first failing request aborts
    /// the whole invocation and no partial result is returned.
    pub async fn invoke_with_key(
        &self,
        query_set: &QuerySet,
        key_name: &str,
    ) -> BatchResult<ResponseSet> {
        self.params.validate()?;

        info!(
            "Worker {} sending {} queries (model {})",
            self.id,
            query_set.len(),
            self.params.model().unwrap_or_default()
        );

        let requests = query_set
            .iter()
            .enumerate()
            .map(|(index, query)| self.answer(index, query));
        let records = try_join_all(requests).await?;

        info!("Worker {} received {} responses", self.id, records.len());
        Ok(ResponseSet::new(key_name, records))
    }

    async fn answer(&self, index: usize, query: &str) -> BatchResult<ResponseRecord> {
        debug!("Worker {} query #{index}", self.id);

        match self.client.complete(&self.params, query).await {
            Ok(response) => Ok(ResponseRecord::new(query, response)),
            Err(e) => {
                warn!("Worker {} query #{index} failed: {e}", self.id);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
