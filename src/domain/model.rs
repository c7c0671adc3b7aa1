use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Title used when none can be found for a URL.
pub const FALLBACK_TITLE: &str = "Unknown Title";

/// One completed conversion, as written to the metadata log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub url: String,
    pub title: String,
    /// Platform tag, e.g. "youtube"
    pub source: String,
    pub save_path: PathBuf,
    pub artist: Option<String>,
    pub album: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Active,
}

/// Emitted by the session after every transition so observers can re-read state.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Enqueued { url: String, title: String },
    Started { url: String },
    Completed(DownloadRecord),
    Failed { url: String, reason: String },
}

/// Result of submitting a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued { position: usize },
    AlreadyQueued,
    AlreadyDownloaded,
    Ignored,
}
