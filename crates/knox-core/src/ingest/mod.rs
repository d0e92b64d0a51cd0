mod classifier;
mod lemmatizer;
mod normalizer;
mod pipeline;
mod progress;

pub use classifier::{
    ClassificationError, ClassificationResult, ClassifiedDocument, DocumentClassifier,
    MANUALS_GENERATOR, PUBLICATION_TYPE,
};
pub use lemmatizer::{
    HttpLemmatizer, LemmatizationError, LemmatizationResult, Lemmatizer, RetryingLemmatizer,
};
pub use normalizer::{numbers_to_text, remove_special_characters, to_lower, Normalizer, PreProcessor};
pub use pipeline::{
    DocumentReport, ItemOutcome, PipelineDriver, PipelineError, PipelineResult,
};
pub use progress::{ProgressEvent, ProgressReporter, ProgressStage};
