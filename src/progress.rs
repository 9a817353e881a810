//! Progress and status reporting for generation runs.
//!
//! Inject an [`Arc<dyn ProgressObserver>`] via
//! [`crate::config::GenerationConfigBuilder::progress`] to receive events as
//! the run moves through its two phases:
//!
//! | Phase      | Percent range |
//! |------------|---------------|
//! | extraction | 0 – 50        |
//! | emission   | 50 – 100      |
//!
//! Observers are called inline from the worker running the pipeline and must
//! return promptly. When the consumer lives on another thread (a UI loop, a
//! websocket task), wrap a channel in [`ChannelObserver`]: sends are
//! fire-and-forget and never block the run.
//!
//! # Example
//!
//! ```rust
//! use cardsheet::{ChannelObserver, GenerationConfig, ProgressEvent};
//! use std::sync::Arc;
//!
//! let (observer, mut events) = ChannelObserver::new();
//! let config = GenerationConfig::builder()
//!     .progress(Arc::new(observer))
//!     .build()
//!     .unwrap();
//! # drop(config);
//! # while let Ok(ProgressEvent::Progress { percent, status }) = events.try_recv() {
//! #     eprintln!("{percent:.0}% {status}");
//! # }
//! ```

use crate::model::{GenerationResult, SkippedInput};
use tokio::sync::mpsc;

/// Receives progress events from a generation run.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ProgressObserver: Send + Sync {
    /// Called once, before the first source is extracted.
    fn on_run_start(&self, total_inputs: usize) {
        let _ = total_inputs;
    }

    /// Called after each extracted source and each emitted card group.
    ///
    /// `percent` never decreases within a run.
    fn on_progress(&self, percent: f32, status: &str) {
        let _ = (percent, status);
    }

    /// Called when a source is dropped from the batch.
    fn on_input_skipped(&self, skipped: &SkippedInput) {
        let _ = skipped;
    }

    /// Called once after the document has been written.
    fn on_run_complete(&self, result: &GenerationResult) {
        let _ = result;
    }
}

/// A no-op observer, used when none is configured.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Events forwarded by [`ChannelObserver`].
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started { total_inputs: usize },
    Progress { percent: f32, status: String },
    Skipped(SkippedInput),
    Completed(GenerationResult),
}

/// Forwards every event over an unbounded channel.
///
/// A dropped receiver is not an error: the run simply stops being observed.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelObserver {
    /// Create the observer and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_run_start(&self, total_inputs: usize) {
        self.send(ProgressEvent::Started { total_inputs });
    }

    fn on_progress(&self, percent: f32, status: &str) {
        self.send(ProgressEvent::Progress {
            percent,
            status: status.to_string(),
        });
    }

    fn on_input_skipped(&self, skipped: &SkippedInput) {
        self.send(ProgressEvent::Skipped(skipped.clone()));
    }

    fn on_run_complete(&self, result: &GenerationResult) {
        self.send(ProgressEvent::Completed(result.clone()));
    }
}

/// Percentage reached after `done` of `total` steps of the extraction phase.
pub(crate) fn extraction_percent(done: usize, total: usize) -> f32 {
    if total == 0 {
        return 50.0;
    }
    done as f32 / total as f32 * 50.0
}

/// Percentage reached after `done` of `total` card groups have been emitted.
pub(crate) fn emission_percent(done: usize, total: usize) -> f32 {
    if total == 0 {
        return 100.0;
    }
    50.0 + done as f32 / total as f32 * 50.0
}
