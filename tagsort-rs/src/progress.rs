//! Cancellation and progress reporting for long-running passes.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag a caller flips to stop a batch.
///
/// Batches check it once per file, so the file being processed when the flag
/// is set is always finished.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Events emitted while a batch runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ProgressEvent {
    /// Link rewriting is about to visit `total` candidate files.
    LinkScanStarted { total: usize },

    /// One candidate file was processed.
    LinksUpdated {
        path: PathBuf,
        index: usize,
        total: usize,
        links_updated: usize,
    },

    /// A note is about to be organized.
    NoteStarted {
        path: PathBuf,
        index: usize,
        total: usize,
    },

    /// A note was moved.
    NoteMoved { from: PathBuf, to: PathBuf },

    /// A note was left where it is.
    NoteSkipped { path: PathBuf, reason: String },

    /// A note could not be organized.
    NoteFailed { path: PathBuf, error: String },

    /// The pass stopped early at the caller's request.
    Cancelled { completed: usize },

    Finished { completed: usize, total: usize },
}

impl ProgressEvent {
    /// Serialize as one JSON line, for hosts that forward events to a UI.
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
