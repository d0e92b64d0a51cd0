use knox_core::QueueDirectory;

/// Shared state of the ingestion service.
#[derive(Clone)]
pub struct AppState {
    pub queue: QueueDirectory,
}

impl AppState {
    #[must_use]
    pub fn new(queue: QueueDirectory) -> Self {
        Self { queue }
    }
}
