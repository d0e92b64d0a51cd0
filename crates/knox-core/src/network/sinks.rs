use thiserror::Error;

use super::client::{ClientError, ServiceClient};
use crate::wordcount::WordFrequencyRecord;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Unable to post graph {graph} to the graph store: {source}")]
    GraphStoreConnection {
        graph: String,
        #[source]
        source: ClientError,
    },
    #[error("Sending word count data failed: {0}")]
    WordCountSend(#[source] ClientError),
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Destination of serialized triple graphs.
#[async_trait::async_trait]
pub trait TripleSink: Send + Sync {
    async fn store_graph(&self, graph_name: &str, serialized: &str) -> SinkResult<()>;
}

/// Destination of word-frequency records.
#[async_trait::async_trait]
pub trait WordCountSink: Send + Sync {
    async fn send_word_counts(&self, records: &[WordFrequencyRecord]) -> SinkResult<()>;
}

pub struct GraphStoreClient {
    client: ServiceClient,
    endpoint: String,
}

impl GraphStoreClient {
    #[must_use]
    pub fn new(client: ServiceClient, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait::async_trait]
impl TripleSink for GraphStoreClient {
    async fn store_graph(&self, graph_name: &str, serialized: &str) -> SinkResult<()> {
        let form = [("graph", graph_name), ("turtle", serialized)];

        self.client
            .post_form(&self.endpoint, &form)
            .await
            .map_err(|source| SinkError::GraphStoreConnection {
                graph: graph_name.to_string(),
                source,
            })?;

        tracing::info!(graph = graph_name, "Sent publication graph to the graph store");
        Ok(())
    }
}

pub struct WordCountClient {
    client: ServiceClient,
    endpoint: String,
}

impl WordCountClient {
    #[must_use]
    pub fn new(client: ServiceClient, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait::async_trait]
impl WordCountSink for WordCountClient {
    async fn send_word_counts(&self, records: &[WordFrequencyRecord]) -> SinkResult<()> {
        let response = self
            .client
            .post_json(&self.endpoint, records)
            .await
            .map_err(SinkError::WordCountSend)?;

        tracing::debug!(
            status = response.status().as_u16(),
            records = records.len(),
            "Word count endpoint accepted records"
        );
        Ok(())
    }
}
