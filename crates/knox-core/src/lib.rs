pub mod config;
pub mod document;
pub mod ingest;
pub mod network;
pub mod queue;
pub mod rdf;
pub mod wordcount;

pub use config::{ConfigError, ConfigResult, KnoxConfig};
pub use document::{Article, Document, DocumentVariant};
pub use ingest::{
    ClassificationError, ClassifiedDocument, DocumentClassifier, DocumentReport, ItemOutcome,
    LemmatizationError, Lemmatizer, Normalizer, PipelineDriver, PipelineError, PipelineResult,
    PreProcessor, ProgressEvent, ProgressReporter, ProgressStage,
};
pub use network::{ServiceClient, SinkError, TripleSink, WordCountSink};
pub use queue::{QueueDirectory, QueueError, QueueItem, QueueResult};
pub use rdf::{RdfError, Triple, TripleExtractor, TripleGraph, Vocab};
pub use wordcount::{EmptyBufferError, WordFrequencyHandler, WordFrequencyRecord};
