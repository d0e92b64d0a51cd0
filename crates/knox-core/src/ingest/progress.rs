use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Construction,
    Normalization,
}

impl std::fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Construction => f.write_str("construction"),
            Self::Normalization => f.write_str("normalization"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    pub publisher: String,
    pub percent: f64,
}

/// Optional progress observer. Reporting never blocks: events that do not fit
/// in the channel, or that have no receiver left, are dropped.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<mpsc::Sender<ProgressEvent>>,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(sender: mpsc::Sender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Reports `done` of `total` items for `stage`.
    pub fn report(&self, stage: ProgressStage, publisher: &str, done: usize, total: usize) {
        #[allow(clippy::cast_precision_loss)]
        let percent = if total == 0 {
            100.0
        } else {
            done as f64 / total as f64 * 100.0
        };

        tracing::debug!(%stage, publisher, percent, "Progress");

        if let Some(sender) = &self.sender {
            let _ = sender.try_send(ProgressEvent {
                stage,
                publisher: publisher.to_string(),
                percent,
            });
        }
    }
}
