use std::path::PathBuf;

use image::RgbaImage;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info};

use crate::config::LookupFailurePolicy;
use crate::domain::{
    AppError, Converter, DownloadRecord, EnqueueOutcome, SessionEvent, SessionPhase,
    SpectrogramRenderer, TitleLookup, FALLBACK_TITLE,
};
use crate::store::MetadataStore;
use crate::utils::source_tag;

use super::display_names::DisplayNameCache;
use super::download_queue::DownloadQueue;

/// Drives the download state machine for one running process.
///
/// Owns the queue, the metadata store and the title cache. Every call is
/// synchronous; a conversion blocks until the converter returns.
pub struct SessionController<C, L, R> {
    store: MetadataStore,
    queue: DownloadQueue,
    names: DisplayNameCache<L>,
    // Completed URLs in display order
    completed: Vec<String>,
    converter: C,
    renderer: R,
    download_dir: PathBuf,
    observers: Vec<UnboundedSender<SessionEvent>>,
}

impl<C, L, R> SessionController<C, L, R>
where
    C: Converter,
    L: TitleLookup,
    R: SpectrogramRenderer,
{
    pub fn new(
        store: MetadataStore,
        converter: C,
        lookup: L,
        renderer: R,
        download_dir: PathBuf,
        policy: LookupFailurePolicy,
    ) -> Self {
        let mut names = DisplayNameCache::new(lookup, policy);
        names.seed(store.records().map(|r| (r.url.clone(), r.title.clone())));
        let completed = store.records().map(|r| r.url.clone()).collect();

        Self {
            store,
            queue: DownloadQueue::new(),
            names,
            completed,
            converter,
            renderer,
            download_dir,
            observers: Vec::new(),
        }
    }

    /// Receive a [`SessionEvent`] after every transition.
    pub fn subscribe(&mut self) -> UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    /// Queue `url` for conversion and resolve its display name.
    pub fn enqueue(&mut self, url: &str) -> Result<EnqueueOutcome, AppError> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(EnqueueOutcome::Ignored);
        }
        if self.store.contains(url) {
            info!(%url, "already downloaded");
            return Ok(EnqueueOutcome::AlreadyDownloaded);
        }
        if self.queue.contains(url) {
            info!(%url, "already queued");
            return Ok(EnqueueOutcome::AlreadyQueued);
        }

        let title = self.names.get(url)?.to_string();
        let Some(position) = self.queue.enqueue(url.to_string()) else {
            return Ok(EnqueueOutcome::AlreadyQueued);
        };

        info!(%url, %title, position, "enqueued");
        self.notify(SessionEvent::Enqueued {
            url: url.to_string(),
            title,
        });
        Ok(EnqueueOutcome::Queued { position })
    }

    /// Advance the state machine by one refresh cycle.
    ///
    /// Idle with pending work promotes the queue head. Active runs the
    /// conversion to completion and records it; on failure the active
    /// slot is cleared without a record and the error is returned.
    pub fn tick(&mut self) -> Result<Option<SessionEvent>, AppError> {
        let event = match self.queue.phase() {
            SessionPhase::Idle => match self.queue.promote() {
                Some(url) => {
                    info!(%url, "download started");
                    SessionEvent::Started {
                        url: url.to_string(),
                    }
                }
                None => return Ok(None),
            },
            SessionPhase::Active => {
                let Some(url) = self.queue.finish() else {
                    return Ok(None);
                };
                match self.complete(url.clone()) {
                    Ok(record) => SessionEvent::Completed(record),
                    Err(e) => {
                        error!(%url, error = %e, "download failed");
                        self.notify(SessionEvent::Failed {
                            url,
                            reason: e.to_string(),
                        });
                        return Err(e);
                    }
                }
            }
        };

        self.notify(event.clone());
        Ok(Some(event))
    }

    fn complete(&mut self, url: String) -> Result<DownloadRecord, AppError> {
        let save_path = self
            .converter
            .convert(&url, &self.download_dir)
            .map_err(|source| AppError::Conversion {
                url: url.clone(),
                source,
            })?;

        let title = self
            .names
            .peek(&url)
            .unwrap_or(FALLBACK_TITLE)
            .to_string();
        let record = DownloadRecord {
            source: source_tag(&url),
            url,
            title,
            save_path,
            artist: None,
            album: None,
        };

        self.store.append(record.clone())?;
        self.completed.push(record.url.clone());
        info!(url = %record.url, path = %record.save_path.display(), "download completed");
        Ok(record)
    }

    /// Render the spectrogram of a completed download.
    pub fn spectrogram(&self, url: &str) -> Result<RgbaImage, AppError> {
        let record = self
            .store
            .get(url)
            .ok_or_else(|| AppError::UnknownDownload(url.to_string()))?;
        info!(%url, path = %record.save_path.display(), "rendering spectrogram");
        Ok(self.renderer.render(&record.save_path)?)
    }

    pub fn phase(&self) -> SessionPhase {
        self.queue.phase()
    }

    pub fn active(&self) -> Option<&str> {
        self.queue.active()
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> + '_ {
        self.queue.pending()
    }

    pub fn completed(&self) -> impl Iterator<Item = &DownloadRecord> + '_ {
        self.completed.iter().filter_map(|url| self.store.get(url))
    }

    pub fn display_name<'a>(&'a self, url: &'a str) -> &'a str {
        self.names.peek(url).unwrap_or(url)
    }

    fn notify(&mut self, event: SessionEvent) {
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fakes::{FakeConverter, FakeRenderer, FakeTitles};
    use crate::domain::{SpectrogramError, StoreError};
    use std::fs;
    use tempfile::TempDir;

    type TestSession<'a> =
        SessionController<&'a FakeConverter, &'a FakeTitles, FakeRenderer>;

    fn session<'a>(
        dir: &TempDir,
        converter: &'a FakeConverter,
        titles: &'a FakeTitles,
        policy: LookupFailurePolicy,
    ) -> TestSession<'a> {
        let store = MetadataStore::open(dir.path().join("all_downloads.jsonl")).unwrap();
        SessionController::new(
            store,
            converter,
            titles,
            FakeRenderer,
            dir.path().join("downloads"),
            policy,
        )
    }

    fn assert_disjoint(session: &TestSession<'_>) {
        if let Some(active) = session.active() {
            assert!(session.pending().all(|url| url != active));
        }
    }

    #[test]
    fn test_serial_fifo_trace() {
        let dir = TempDir::new().unwrap();
        let converter = FakeConverter::new();
        let titles = FakeTitles::new().with("https://x/A", "Song A").with("https://x/B", "Song B");
        let mut s = session(&dir, &converter, &titles, LookupFailurePolicy::Propagate);

        assert_eq!(s.enqueue("https://x/A").unwrap(), EnqueueOutcome::Queued { position: 0 });
        assert_eq!(s.enqueue("https://x/B").unwrap(), EnqueueOutcome::Queued { position: 1 });
        assert_eq!(s.phase(), SessionPhase::Idle);

        s.tick().unwrap();
        assert_eq!(s.active(), Some("https://x/A"));
        assert_eq!(s.pending().collect::<Vec<_>>(), vec!["https://x/B"]);
        assert_disjoint(&s);

        let event = s.tick().unwrap();
        assert!(matches!(event, Some(SessionEvent::Completed(ref r)) if r.url == "https://x/A"));
        assert_eq!(s.phase(), SessionPhase::Idle);
        assert_eq!(
            s.completed().map(|r| r.title.as_str()).collect::<Vec<_>>(),
            vec!["Song A"]
        );

        s.tick().unwrap();
        assert_eq!(s.active(), Some("https://x/B"));
        assert_eq!(s.pending().count(), 0);
        assert_disjoint(&s);

        s.tick().unwrap();
        assert_eq!(s.tick().unwrap(), None);
        assert_eq!(converter.converted(), vec!["https://x/A", "https://x/B"]);
    }

    #[test]
    fn test_completed_record_is_persisted() {
        let dir = TempDir::new().unwrap();
        let converter = FakeConverter::new();
        let titles = FakeTitles::new().with("https://youtu.be/dQw4w9WgXcQ", "Rick");
        let mut s = session(&dir, &converter, &titles, LookupFailurePolicy::Propagate);

        s.enqueue("https://youtu.be/dQw4w9WgXcQ").unwrap();
        s.tick().unwrap();
        s.tick().unwrap();

        let store = MetadataStore::open(dir.path().join("all_downloads.jsonl")).unwrap();
        let record = store.get("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(record.title, "Rick");
        assert_eq!(record.source, "youtube");
        assert_eq!(record.save_path, dir.path().join("downloads").join("dQw4w9WgXcQ.mp3"));
        assert_eq!(record.artist, None);
    }

    #[test]
    fn test_failed_conversion_leaves_no_record() {
        let dir = TempDir::new().unwrap();
        let converter = FakeConverter::new().failing("https://x/A");
        let titles = FakeTitles::new().with("https://x/A", "A").with("https://x/B", "B");
        let mut s = session(&dir, &converter, &titles, LookupFailurePolicy::Propagate);
        let mut events = s.subscribe();

        s.enqueue("https://x/A").unwrap();
        s.enqueue("https://x/B").unwrap();
        s.tick().unwrap();

        let err = s.tick().unwrap_err();
        assert!(matches!(err, AppError::Conversion { ref url, .. } if url == "https://x/A"));
        assert_eq!(s.phase(), SessionPhase::Idle);
        assert_eq!(s.completed().count(), 0);

        s.tick().unwrap();
        assert_eq!(s.active(), Some("https://x/B"));

        let reopened = MetadataStore::open(dir.path().join("all_downloads.jsonl")).unwrap();
        assert!(!reopened.contains("https://x/A"));

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(seen
            .iter()
            .any(|e| matches!(e, SessionEvent::Failed { url, .. } if url == "https://x/A")));
    }

    #[test]
    fn test_failed_conversion_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let converter = FakeConverter::new().failing("https://x/A");
        let titles = FakeTitles::new().with("https://x/A", "A");
        let mut s = session(&dir, &converter, &titles, LookupFailurePolicy::Propagate);

        s.enqueue("https://x/A").unwrap();
        s.tick().unwrap();
        assert!(s.tick().is_err());
        assert_eq!(s.tick().unwrap(), None);
        assert_eq!(converter.converted().len(), 1);
    }

    #[test]
    fn test_append_failure_clears_slot_without_record() {
        let dir = TempDir::new().unwrap();
        let converter = FakeConverter::new();
        let titles = FakeTitles::new().with("https://x/A", "A");
        let mut s = session(&dir, &converter, &titles, LookupFailurePolicy::Propagate);
        let mut events = s.subscribe();

        s.enqueue("https://x/A").unwrap();
        s.tick().unwrap();

        let log = dir.path().join("all_downloads.jsonl");
        fs::remove_file(&log).unwrap();
        fs::create_dir(&log).unwrap();

        assert!(matches!(s.tick(), Err(AppError::Store(StoreError::Io(_)))));
        assert_eq!(s.phase(), SessionPhase::Idle);
        assert_eq!(s.active(), None);
        assert_eq!(s.completed().count(), 0);
        assert_eq!(converter.converted(), vec!["https://x/A"]);

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(matches!(
            seen.last(),
            Some(SessionEvent::Failed { url, .. }) if url == "https://x/A"
        ));

        assert_eq!(s.enqueue("https://x/A").unwrap(), EnqueueOutcome::Queued { position: 0 });
    }

    #[test]
    fn test_lookup_failure_with_fallback_still_enqueues() {
        let dir = TempDir::new().unwrap();
        let converter = FakeConverter::new();
        let titles = FakeTitles::new();
        let mut s = session(&dir, &converter, &titles, LookupFailurePolicy::UseFallbackTitle);

        assert_eq!(s.enqueue("https://x/A").unwrap(), EnqueueOutcome::Queued { position: 0 });
        assert_eq!(s.display_name("https://x/A"), FALLBACK_TITLE);

        s.tick().unwrap();
        match s.tick().unwrap() {
            Some(SessionEvent::Completed(record)) => assert_eq!(record.title, FALLBACK_TITLE),
            other => panic!("unexpected tick result: {:?}", other),
        }
    }

    #[test]
    fn test_lookup_failure_with_propagate_rejects() {
        let dir = TempDir::new().unwrap();
        let converter = FakeConverter::new();
        let titles = FakeTitles::new();
        let mut s = session(&dir, &converter, &titles, LookupFailurePolicy::Propagate);

        assert!(matches!(s.enqueue("https://x/A"), Err(AppError::TitleLookup(_))));
        assert_eq!(s.pending().count(), 0);
        assert_eq!(s.tick().unwrap(), None);
    }

    #[test]
    fn test_enqueue_rejects_known_urls() {
        let dir = TempDir::new().unwrap();
        let converter = FakeConverter::new();
        let titles = FakeTitles::new().with("https://x/A", "A");
        let mut s = session(&dir, &converter, &titles, LookupFailurePolicy::Propagate);

        assert_eq!(s.enqueue("   ").unwrap(), EnqueueOutcome::Ignored);
        s.enqueue(" https://x/A ").unwrap();
        assert_eq!(s.enqueue("https://x/A").unwrap(), EnqueueOutcome::AlreadyQueued);

        s.tick().unwrap();
        assert_eq!(s.enqueue("https://x/A").unwrap(), EnqueueOutcome::AlreadyQueued);

        s.tick().unwrap();
        assert_eq!(s.enqueue("https://x/A").unwrap(), EnqueueOutcome::AlreadyDownloaded);
        assert_eq!(titles.calls(), 1);
    }

    #[test]
    fn test_stored_records_seed_completed_and_titles() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = MetadataStore::open(dir.path().join("all_downloads.jsonl")).unwrap();
            store
                .append(DownloadRecord {
                    url: "https://x/old".to_string(),
                    title: "Old Song".to_string(),
                    source: "x".to_string(),
                    save_path: dir.path().join("old.mp3"),
                    artist: None,
                    album: None,
                })
                .unwrap();
        }

        let converter = FakeConverter::new();
        let titles = FakeTitles::new();
        let s = session(&dir, &converter, &titles, LookupFailurePolicy::Propagate);

        assert_eq!(s.completed().count(), 1);
        assert_eq!(s.display_name("https://x/old"), "Old Song");
        assert_eq!(titles.calls(), 0);
    }

    #[test]
    fn test_events_follow_transitions() {
        let dir = TempDir::new().unwrap();
        let converter = FakeConverter::new();
        let titles = FakeTitles::new().with("https://x/A", "A");
        let mut s = session(&dir, &converter, &titles, LookupFailurePolicy::Propagate);
        let mut events = s.subscribe();

        s.enqueue("https://x/A").unwrap();
        s.tick().unwrap();
        s.tick().unwrap();
        s.tick().unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(seen.len(), 3);
        assert!(matches!(seen[0], SessionEvent::Enqueued { ref title, .. } if title == "A"));
        assert!(matches!(seen[1], SessionEvent::Started { ref url } if url == "https://x/A"));
        assert!(matches!(seen[2], SessionEvent::Completed(_)));
    }

    #[test]
    fn test_spectrogram_for_completed_download() {
        let dir = TempDir::new().unwrap();
        let converter = FakeConverter::new();
        let titles = FakeTitles::new().with("https://x/A", "A");
        let mut s = session(&dir, &converter, &titles, LookupFailurePolicy::Propagate);

        assert!(matches!(
            s.spectrogram("https://x/A"),
            Err(AppError::UnknownDownload(_))
        ));

        s.enqueue("https://x/A").unwrap();
        s.tick().unwrap();
        s.tick().unwrap();

        assert!(matches!(
            s.spectrogram("https://x/A"),
            Err(AppError::Spectrogram(SpectrogramError::SourceMissing(_)))
        ));

        let saved = dir.path().join("downloads").join("A.mp3");
        fs::create_dir_all(saved.parent().unwrap()).unwrap();
        fs::write(&saved, b"ID3").unwrap();
        let image = s.spectrogram("https://x/A").unwrap();
        assert_eq!(image.dimensions(), (4, 2));
    }
}
