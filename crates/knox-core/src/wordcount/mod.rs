mod frequency;
mod handler;

pub use frequency::{build_record, count, TermFrequencyTable, WordCount, WordFrequencyRecord};
pub use handler::{BackupError, EmptyBufferError, WordCountError, WordFrequencyHandler};
