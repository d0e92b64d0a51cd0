use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use super::classifier::{ClassificationError, ClassifiedDocument, DocumentClassifier};
use super::lemmatizer::{HttpLemmatizer, LemmatizationError, Lemmatizer, RetryingLemmatizer};
use super::normalizer::{Normalizer, PreProcessor};
use super::progress::ProgressReporter;
use crate::config::KnoxConfig;
use crate::document::DocumentVariant;
use crate::network::{
    ClientError, GraphStoreClient, ServiceClient, SinkError, TripleSink, WordCountClient,
    WordCountSink,
};
use crate::queue::{QueueDirectory, QueueError, QueueItem};
use crate::rdf::TripleExtractor;
use crate::wordcount::{WordCountError, WordFrequencyHandler};

const TRIPLE_BACKUP_PREFIX: &str = "triples_";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),
    #[error("Lemmatization error: {0}")]
    Lemmatization(#[from] LemmatizationError),
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("Word count error: {0}")]
    WordCount(#[from] WordCountError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("HTTP client error: {0}")]
    Client(#[from] ClientError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Whether the queue item should stay queued for a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Lemmatization(e) if e.is_connection())
    }
}

/// Summary of one processed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub publisher: String,
    pub variant: DocumentVariant,
    pub articles: usize,
    pub word_count_records: usize,
    pub triples: usize,
    pub word_counts_delivered: bool,
    pub triples_delivered: bool,
}

/// What happened to a queue item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Processed(DocumentReport),
    Rejected(PathBuf),
    Retained,
}

/// Polls the queue directory and runs every payload through classification,
/// normalization, word counting and triple extraction, one at a time.
pub struct PipelineDriver {
    queue: QueueDirectory,
    error_dir: PathBuf,
    ontology_namespace: String,
    poll_interval: Duration,
    max_item_attempts: u32,
    classifier: DocumentClassifier,
    progress: ProgressReporter,
    lemmatizer: Arc<dyn Lemmatizer>,
    triple_sink: Arc<dyn TripleSink>,
    word_count_sink: Arc<dyn WordCountSink>,
}

impl PipelineDriver {
    #[must_use]
    pub fn new(
        config: &KnoxConfig,
        lemmatizer: Arc<dyn Lemmatizer>,
        triple_sink: Arc<dyn TripleSink>,
        word_count_sink: Arc<dyn WordCountSink>,
    ) -> Self {
        Self {
            queue: QueueDirectory::new(config.queue_dir.clone()),
            error_dir: config.error_dir.clone(),
            ontology_namespace: config.ontology_namespace.clone(),
            poll_interval: config.poll_interval(),
            max_item_attempts: config.max_item_attempts,
            classifier: DocumentClassifier::new(),
            progress: ProgressReporter::disabled(),
            lemmatizer,
            triple_sink,
            word_count_sink,
        }
    }

    /// Driver talking to the remote lemmatizer, graph store and word count
    /// endpoint named in `config`.
    pub fn from_config(config: &KnoxConfig) -> PipelineResult<Self> {
        let client = ServiceClient::from_config(config)?;

        let lemmatizer = RetryingLemmatizer::new(
            HttpLemmatizer::new(client.clone(), config.lemmatizer_url.clone()),
            config.lemmatizer_retries,
        );
        let triple_sink = GraphStoreClient::new(client.clone(), config.triple_data_url.clone());
        let word_count_sink = WordCountClient::new(client, config.word_count_url.clone());

        Ok(Self::new(
            config,
            Arc::new(lemmatizer),
            Arc::new(triple_sink),
            Arc::new(word_count_sink),
        ))
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.classifier = self.classifier.with_progress(progress.clone());
        self.progress = progress;
        self
    }

    pub fn queue(&self) -> &QueueDirectory {
        &self.queue
    }

    fn rejected_dir(&self) -> PathBuf {
        self.error_dir.join("rejected")
    }

    /// Runs one payload end to end. Sink failures are absorbed into backup
    /// files; only classification and lemmatization errors are returned.
    pub async fn process_payload(&self, payload: &Value) -> PipelineResult<DocumentReport> {
        let ClassifiedDocument {
            variant,
            mut document,
        } = self.classifier.classify(payload)?;
        let original = document.clone();

        PreProcessor::new(variant, Arc::clone(&self.lemmatizer))
            .with_progress(self.progress.clone())
            .process(&mut document)
            .await?;

        let mut extractor = TripleExtractor::for_variant(variant, self.ontology_namespace.clone());
        extractor.extract_normalized(&document, &original);

        let mut word_counts = WordFrequencyHandler::new();
        for article in &document.articles {
            word_counts.word_count_article(
                &article.title,
                &article.body,
                std::slice::from_ref(&article.path),
            );
        }
        let word_count_records = word_counts.pending_count();

        let word_counts_delivered = match word_counts
            .send_pending(self.word_count_sink.as_ref(), &self.error_dir)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(publisher = document.publisher(), "Word count data not delivered: {}", e);
                false
            }
        };

        let serialized = extractor.serialize();
        let triples = serialized.lines().count();
        let triples_delivered = self
            .store_triples(document.graph_name(), &serialized)
            .await;

        let report = DocumentReport {
            publisher: document.publisher().to_string(),
            variant,
            articles: document.article_count(),
            word_count_records,
            triples,
            word_counts_delivered,
            triples_delivered,
        };

        tracing::info!(
            publisher = %report.publisher,
            variant = %report.variant,
            articles = report.articles,
            triples = report.triples,
            "Processed document"
        );
        Ok(report)
    }

    async fn store_triples(&self, graph_name: &str, serialized: &str) -> bool {
        if serialized.is_empty() {
            return true;
        }

        let Err(e) = self.triple_sink.store_graph(graph_name, serialized).await else {
            return true;
        };

        match write_triple_backup(&self.error_dir, serialized).await {
            Ok(path) => tracing::error!(
                graph = graph_name,
                path = %path.display(),
                "Triples not delivered, wrote backup: {}",
                e
            ),
            Err(backup) => tracing::error!(
                graph = graph_name,
                "Triples not delivered ({}) and backup failed: {}",
                e,
                backup
            ),
        }
        false
    }

    /// Processes a single queue item and settles it. Processed items are
    /// removed. After an unreachable-lemmatizer failure the item moves behind
    /// the rest of the queue, until it has used up `max_item_attempts`.
    /// Everything else moves to the rejected directory.
    pub async fn process_item(&self, item: &QueueItem) -> PipelineResult<ItemOutcome> {
        let result = match self.queue.read(item).await {
            Ok(payload) => self.process_payload(&payload).await,
            Err(e) => Err(e.into()),
        };

        let can_retry = item.attempts.saturating_add(1) < self.max_item_attempts;
        match result {
            Ok(report) => {
                self.queue.remove(item).await?;
                Ok(ItemOutcome::Processed(report))
            }
            Err(e) if e.is_transient() && can_retry => {
                let requeued = self.queue.requeue(item).await?;
                tracing::warn!(
                    id = %item.id,
                    attempts = requeued.attempts,
                    "Keeping queue item for a later attempt: {}",
                    e
                );
                Ok(ItemOutcome::Retained)
            }
            Err(e) => {
                let target = self.queue.reject(item, &self.rejected_dir()).await?;
                tracing::warn!(
                    id = %item.id,
                    attempts = item.attempts.saturating_add(1),
                    path = %target.display(),
                    "Rejected queue item: {}",
                    e
                );
                Ok(ItemOutcome::Rejected(target))
            }
        }
    }

    /// Processes the oldest queue item, if any. Kept items are requeued
    /// behind newer ones, so one failing item never blocks the others.
    pub async fn run_once(&self) -> PipelineResult<Option<ItemOutcome>> {
        let Some(item) = self.queue.next().await? else {
            return Ok(None);
        };
        self.process_item(&item).await.map(Some)
    }

    /// Polls until `shutdown` turns true. The flag is only checked between
    /// documents, so a document in flight is always finished.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> PipelineResult<()> {
        self.queue.ensure_exists().await?;
        tracing::info!(queue = %self.queue.path().display(), "Pipeline driver started");

        loop {
            let stop = *shutdown.borrow();
            if stop {
                break;
            }

            match self.run_once().await {
                Ok(Some(ItemOutcome::Processed(_) | ItemOutcome::Rejected(_))) => continue,
                Ok(Some(ItemOutcome::Retained) | None) => {}
                Err(e) => tracing::error!("Queue polling failed: {}", e),
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        tracing::info!("Pipeline driver stopped");
        Ok(())
    }
}

async fn write_triple_backup(dir: &Path, serialized: &str) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
    let path = dir.join(format!("{TRIPLE_BACKUP_PREFIX}{stamp}.nt"));
    let tmp = dir.join(format!("{TRIPLE_BACKUP_PREFIX}{stamp}.nt.tmp"));

    tokio::fs::write(&tmp, serialized).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(path)
}
