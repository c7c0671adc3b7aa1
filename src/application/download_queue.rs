use std::collections::VecDeque;

use crate::domain::SessionPhase;

/// FIFO of pending URLs plus the single in-flight slot.
///
/// A URL is tracked at most once across both.
#[derive(Debug, Default)]
pub struct DownloadQueue {
    pending: VecDeque<String>,
    active: Option<String>,
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `url` to the pending sequence.
    ///
    /// Returns the 0-based pending position, or `None` if the URL is
    /// already pending or active.
    pub fn enqueue(&mut self, url: String) -> Option<usize> {
        if self.contains(&url) {
            return None;
        }
        self.pending.push_back(url);
        Some(self.pending.len() - 1)
    }

    /// Move the head of the pending sequence into the active slot.
    ///
    /// Only when idle; returns the newly active URL.
    pub fn promote(&mut self) -> Option<&str> {
        if self.active.is_some() {
            return None;
        }
        self.active = self.pending.pop_front();
        self.active.as_deref()
    }

    /// Clear the active slot, handing back the URL that was in flight.
    pub fn finish(&mut self) -> Option<String> {
        self.active.take()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.active.is_some() {
            SessionPhase::Active
        } else {
            SessionPhase::Idle
        }
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> + '_ {
        self.pending.iter().map(String::as_str)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.active.as_deref() == Some(url) || self.pending.iter().any(|u| u == url)
    }
}
