use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::frequency::{build_record, count, WordFrequencyRecord};
use crate::network::{SinkError, WordCountSink};

const BACKUP_FILE_PREFIX: &str = "word_count_";

#[derive(Debug, Error)]
#[error("No pending word count records")]
pub struct EmptyBufferError;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum WordCountError {
    #[error(transparent)]
    Send(#[from] SinkError),
    #[error("Sending failed ({send}) and the backup could not be written: {backup}")]
    BackupFailed { send: SinkError, backup: BackupError },
}

#[derive(Serialize)]
struct BackupFile<'a> {
    back_up: &'a [WordFrequencyRecord],
}

/// Holds word-frequency records until they are delivered to the word-count
/// sink.
#[derive(Debug, Default)]
pub struct WordFrequencyHandler {
    pending: Vec<WordFrequencyRecord>,
}

impl WordFrequencyHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts an article and queues its record. Returns whether a record was
    /// queued; articles without a title are skipped.
    pub fn word_count_article(&mut self, title: &str, body: &str, paths: &[String]) -> bool {
        let table = count(body);
        match build_record(title, paths, &table) {
            Some(record) => {
                self.enqueue(record);
                true
            }
            None => false,
        }
    }

    pub fn enqueue(&mut self, record: WordFrequencyRecord) {
        self.pending.push(record);
    }

    /// Removes and returns the most recently queued record.
    pub fn dequeue_next(&mut self) -> Result<WordFrequencyRecord, EmptyBufferError> {
        self.pending.pop().ok_or(EmptyBufferError)
    }

    /// Removes every pending record, oldest first.
    pub fn drain_pending(&mut self) -> Vec<WordFrequencyRecord> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[WordFrequencyRecord] {
        &self.pending
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Writes all pending records to `path` as `{"back_up": [...]}` and
    /// clears the buffer, whether or not the write succeeded.
    pub async fn flush_to_backup(&mut self, path: &Path) -> Result<(), BackupError> {
        let result = write_backup(path, &self.pending).await;
        self.pending.clear();
        result
    }

    /// Sends all pending records in one request. On failure the records go to
    /// a timestamped backup file in `backup_dir`; the buffer is empty either
    /// way.
    pub async fn send_pending(
        &mut self,
        sink: &dyn WordCountSink,
        backup_dir: &Path,
    ) -> Result<usize, WordCountError> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        match sink.send_word_counts(&self.pending).await {
            Ok(()) => {
                let sent = self.pending.len();
                self.pending.clear();
                tracing::info!(records = sent, "Sent pending word count data");
                Ok(sent)
            }
            Err(send) => {
                let path = backup_path(backup_dir);
                tracing::error!(
                    error = %send,
                    path = %path.display(),
                    "Sending word count data failed, writing backup"
                );
                match self.flush_to_backup(&path).await {
                    Ok(()) => Err(WordCountError::Send(send)),
                    Err(backup) => Err(WordCountError::BackupFailed { send, backup }),
                }
            }
        }
    }
}

fn backup_path(dir: &Path) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
    dir.join(format!("{BACKUP_FILE_PREFIX}{stamp}.json"))
}

async fn write_backup(path: &Path, records: &[WordFrequencyRecord]) -> Result<(), BackupError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let body = serde_json::to_vec_pretty(&BackupFile { back_up: records })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{ClientError, SinkResult};
    use std::sync::Mutex;

    fn record(title: &str) -> WordFrequencyRecord {
        build_record(title, &[format!("{title}.json")], &count("a b a")).unwrap()
    }

    #[derive(Default)]
    struct RecordingSink {
        fail: bool,
        received: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl WordCountSink for RecordingSink {
        async fn send_word_counts(&self, records: &[WordFrequencyRecord]) -> SinkResult<()> {
            if self.fail {
                return Err(SinkError::WordCountSend(ClientError::Connect(
                    "http://db".into(),
                )));
            }
            self.received
                .lock()
                .unwrap()
                .push(records.iter().map(|r| r.article_title.clone()).collect());
            Ok(())
        }
    }

    #[test]
    fn test_dequeue_returns_most_recent() {
        let mut handler = WordFrequencyHandler::new();
        handler.enqueue(record("A"));
        handler.enqueue(record("B"));

        assert_eq!(handler.dequeue_next().unwrap().article_title, "B");
        assert_eq!(handler.dequeue_next().unwrap().article_title, "A");
        assert!(handler.dequeue_next().is_err());
    }

    #[test]
    fn test_empty_title_never_buffered() {
        let mut handler = WordFrequencyHandler::new();

        assert!(!handler.word_count_article("", "words here", &["x.json".into()]));
        assert!(handler.word_count_article("Title", "words here", &["x.json".into()]));

        assert_eq!(handler.pending_count(), 1);
        assert!(handler.pending().iter().all(|r| !r.article_title.is_empty()));
    }

    #[tokio::test]
    async fn test_flush_to_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");

        let mut handler = WordFrequencyHandler::new();
        handler.enqueue(record("A"));
        handler.enqueue(record("B"));
        handler.flush_to_backup(&path).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let back_up = written["back_up"].as_array().unwrap();

        assert_eq!(back_up.len(), 2);
        assert_eq!(back_up[0]["article_title"], "A");
        assert_eq!(back_up[1]["article_title"], "B");
        assert_eq!(written.as_object().unwrap().len(), 1);
        assert!(matches!(handler.dequeue_next(), Err(EmptyBufferError)));
        assert!(!dir.path().join("backup.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_flush_clears_buffer_on_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut handler = WordFrequencyHandler::new();
        handler.enqueue(record("A"));

        let result = handler.flush_to_backup(&blocker.join("backup.json")).await;

        assert!(result.is_err());
        assert_eq!(handler.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_send_pending_in_enqueue_order() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::default();

        let mut handler = WordFrequencyHandler::new();
        handler.enqueue(record("A"));
        handler.enqueue(record("B"));

        let sent = handler.send_pending(&sink, dir.path()).await.unwrap();

        assert_eq!(sent, 2);
        assert_eq!(handler.pending_count(), 0);
        assert_eq!(*sink.received.lock().unwrap(), vec![vec!["A".to_string(), "B".to_string()]]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_send_pending_failure_writes_backup() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };

        let mut handler = WordFrequencyHandler::new();
        handler.enqueue(record("A"));

        let err = handler.send_pending(&sink, dir.path()).await.unwrap_err();
        assert!(matches!(err, WordCountError::Send(SinkError::WordCountSend(_))));
        assert_eq!(handler.pending_count(), 0);

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("word_count_"));
        assert!(files[0].ends_with(".json"));
    }

    #[tokio::test]
    async fn test_send_pending_empty_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };

        let mut handler = WordFrequencyHandler::new();
        assert_eq!(handler.send_pending(&sink, dir.path()).await.unwrap(), 0);
    }

    #[test]
    fn test_drain_pending_oldest_first() {
        let mut handler = WordFrequencyHandler::new();
        handler.enqueue(record("A"));
        handler.enqueue(record("B"));

        let drained = handler.drain_pending();
        assert_eq!(drained[0].article_title, "A");
        assert_eq!(drained[1].article_title, "B");
        assert_eq!(handler.pending_count(), 0);
    }
}
