use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

const ITEM_EXTENSION: &str = "json";
const PARTIAL_EXTENSION: &str = "json.tmp";

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Queue item is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type QueueResult<T> = Result<T, QueueError>;

/// A payload waiting in the queue directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub id: String,
    pub path: PathBuf,
    /// Earlier attempts that ended with the item being kept
    pub attempts: u32,
}

impl QueueItem {
    fn from_stem(stem: &str, path: PathBuf) -> Self {
        let (id, attempts) = match stem.rsplit_once('.') {
            Some((id, n)) => match n.parse() {
                Ok(attempts) => (id, attempts),
                Err(_) => (stem, 0),
            },
            None => (stem, 0),
        };
        Self {
            id: id.to_string(),
            path,
            attempts,
        }
    }
}

/// Directory of pending payloads, one `<uuid v7>.json` file each.
///
/// Writers create `<id>.json.tmp` and rename it once complete, readers only
/// see `*.json`. Ids are time ordered, so the lexically smallest item is the
/// oldest. A requeued item is named `<new id>.<attempts>.json`.
#[derive(Debug, Clone)]
pub struct QueueDirectory {
    dir: PathBuf,
}

impl QueueDirectory {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_exists(&self) -> QueueResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Stores `payload` as a new item and returns its id.
    pub async fn enqueue(&self, payload: &Value) -> QueueResult<String> {
        let id = Uuid::now_v7().to_string();
        let body = serde_json::to_vec(payload)?;

        let partial = self.dir.join(format!("{id}.{PARTIAL_EXTENSION}"));
        let complete = self.dir.join(format!("{id}.{ITEM_EXTENSION}"));

        tokio::fs::write(&partial, body).await?;
        if let Err(e) = tokio::fs::rename(&partial, &complete).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        tracing::debug!(id = %id, "Queued payload");
        Ok(id)
    }

    /// All complete items, oldest first.
    pub async fn items(&self) -> QueueResult<Vec<QueueItem>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut items = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ITEM_EXTENSION) {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            items.push(QueueItem::from_stem(id, path.clone()));
        }

        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    pub async fn next(&self) -> QueueResult<Option<QueueItem>> {
        Ok(self.items().await?.into_iter().next())
    }

    pub async fn pending_count(&self) -> QueueResult<usize> {
        Ok(self.items().await?.len())
    }

    pub async fn read(&self, item: &QueueItem) -> QueueResult<Value> {
        let body = tokio::fs::read(&item.path).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn remove(&self, item: &QueueItem) -> QueueResult<()> {
        tokio::fs::remove_file(&item.path).await?;
        Ok(())
    }

    /// Moves an item behind every item queued so far and bumps its attempt
    /// count.
    pub async fn requeue(&self, item: &QueueItem) -> QueueResult<QueueItem> {
        let id = Uuid::now_v7().to_string();
        let attempts = item.attempts.saturating_add(1);
        let path = self.dir.join(format!("{id}.{attempts}.{ITEM_EXTENSION}"));

        tokio::fs::rename(&item.path, &path).await?;
        tracing::debug!(from = %item.id, to = %id, attempts, "Requeued payload");
        Ok(QueueItem { id, path, attempts })
    }

    /// Moves an item out of the queue into `rejected_dir`.
    pub async fn reject(&self, item: &QueueItem, rejected_dir: &Path) -> QueueResult<PathBuf> {
        tokio::fs::create_dir_all(rejected_dir).await?;
        let target = rejected_dir.join(format!("{}.{ITEM_EXTENSION}", item.id));

        if tokio::fs::rename(&item.path, &target).await.is_err() {
            // rename fails across file systems
            tokio::fs::copy(&item.path, &target).await?;
            tokio::fs::remove_file(&item.path).await?;
        }
        Ok(target)
    }
}
