//! One-way progress notification port consumed by UI shells and the CLI.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Stage of a single conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStage {
    Validating,
    Parsing,
    Rendering,
    Encoding,
    Completed,
    Failed,
    Cancelled,
}

/// A progress event emitted by the converter service.
///
/// For batches, `file_index`/`total_files` carry k/N semantics; the completed
/// count never decreases, but events from concurrently processed files are
/// not otherwise ordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Index of the file this event pertains to.
    pub file_index: usize,
    /// Total number of files in the operation.
    pub total_files: usize,
    /// Name of the current file.
    pub current_file: String,
    /// Coarse percentage for the current file (0, 50, 100).
    pub percent: u8,
    /// Current stage.
    pub stage: ConversionStage,
    /// Short human-readable message.
    pub message: String,
}

/// Sink for progress events. Implementations must be cheap and non-blocking;
/// the converter calls them from worker threads.
pub trait ProgressNotifier: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}

/// Notifier that discards all events.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl ProgressNotifier for NullNotifier {
    fn notify(&self, _event: ProgressEvent) {}
}

/// Notifier that records every event, for tests and debugging.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressNotifier for CollectingNotifier {
    fn notify(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
