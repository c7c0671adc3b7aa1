use crate::application::SessionController;
use crate::config::AppConfig;
use crate::domain::{AppError, EnqueueOutcome, SessionEvent};
use crate::media::{Ffmpeg, SpectrogramConfig, YtDlp, YtDlpConfig};
use crate::store::MetadataStore;
use crate::ui::{EntryState, QueueEntry, QueueMessage, QueueView, SpectrogramView};
use iced::{Subscription, Task};
use image::ImageFormat;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info};

type Session = SessionController<YtDlp, YtDlp, Ffmpeg>;

pub struct SongApp {
    view: QueueView,
    // None when the download history could not be loaded
    session: Option<Session>,
    events: Option<UnboundedReceiver<SessionEvent>>,
    tick_interval: Duration,
}

impl SongApp {
    pub fn new(config: AppConfig) -> Self {
        let mut app = Self {
            view: QueueView::default(),
            session: None,
            events: None,
            tick_interval: config.tick_interval,
        };

        match build_session(&config) {
            Ok(mut session) => {
                app.events = Some(session.subscribe());
                app.session = Some(session);
                app.refresh();
            }
            Err(e) => {
                error!(error = %e, "failed to start session");
                app.view.status_message = format!("Failed to load download history: {}", e);
            }
        }
        app
    }

    /// Apply pending session events and re-read the session into the view.
    fn refresh(&mut self) {
        let Some(session) = &self.session else {
            return;
        };

        if let Some(events) = &mut self.events {
            while let Ok(event) = events.try_recv() {
                self.view.status_message = describe(&event, session);
            }
        }

        let mut entries: Vec<QueueEntry> = session
            .completed()
            .map(|record| QueueEntry {
                url: record.url.clone(),
                title: record.title.clone(),
                state: EntryState::Completed,
            })
            .collect();
        if let Some(url) = session.active() {
            entries.push(QueueEntry {
                url: url.to_string(),
                title: session.display_name(url).to_string(),
                state: EntryState::Active,
            });
        }
        entries.extend(session.pending().map(|url| QueueEntry {
            url: url.to_string(),
            title: session.display_name(url).to_string(),
            state: EntryState::Pending,
        }));
        self.view.entries = entries;
    }

    fn submit(&mut self) {
        let url = std::mem::take(&mut self.view.url_input);
        let Some(session) = &mut self.session else {
            return;
        };

        match session.enqueue(&url) {
            Ok(EnqueueOutcome::Queued { .. }) | Ok(EnqueueOutcome::Ignored) => {}
            Ok(EnqueueOutcome::AlreadyQueued) => {
                self.view.status_message = "Already in the queue".to_string();
            }
            Ok(EnqueueOutcome::AlreadyDownloaded) => {
                self.view.status_message = "Already downloaded".to_string();
            }
            Err(e) => {
                self.view.status_message = format!("Could not add URL: {}", e);
            }
        }
        self.refresh();
    }

    fn tick(&mut self) {
        let Some(session) = &mut self.session else {
            return;
        };
        // Failures reach the view through SessionEvent::Failed
        if let Ok(Some(_)) | Err(_) = session.tick() {
            self.refresh();
        }
    }

    fn select(&mut self, url: &str) {
        let Some(session) = &self.session else {
            return;
        };

        let title = session.display_name(url).to_string();
        match session.spectrogram(url) {
            Ok(image) => {
                self.view.status_message = format!("Selected: {}", title);
                self.view.spectrogram = Some(SpectrogramView::new(title, image));
            }
            Err(e) => {
                error!(%url, error = %e, "spectrogram failed");
                self.view.status_message = e.to_string();
            }
        }
    }

    fn export(&mut self) -> Task<Message> {
        let Some(spectrogram) = &self.view.spectrogram else {
            return Task::none();
        };

        let mut png = Vec::new();
        if let Err(e) = spectrogram
            .image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        {
            self.view.status_message = format!("Failed to encode spectrogram: {}", e);
            return Task::none();
        }

        let filename = format!(
            "{}.png",
            crate::utils::sanitize_filename(&spectrogram.title)
                .trim_matches(|c| c == '.' || c == ' ')
        );

        Task::perform(
            async move {
                let Some(handle) = rfd::AsyncFileDialog::new()
                    .set_file_name(&filename)
                    .add_filter("PNG image", &["png"])
                    .save_file()
                    .await
                else {
                    return Ok(None);
                };

                let path = handle.path().to_path_buf();
                match tokio::fs::write(&path, png).await {
                    Ok(()) => Ok(Some(path)),
                    Err(e) => Err(format!("Failed to write {}: {}", path.display(), e)),
                }
            },
            Message::SpectrogramExported,
        )
    }
}

fn build_session(config: &AppConfig) -> Result<Session, AppError> {
    let store = MetadataStore::open(&config.metadata_file)?;
    let ytdlp = YtDlp::new(YtDlpConfig {
        program: config.ytdlp_program.clone(),
        ..Default::default()
    });
    let ffmpeg = Ffmpeg::new(SpectrogramConfig {
        program: config.ffmpeg_program.clone(),
        ..Default::default()
    });

    info!(
        download_dir = %config.download_dir.display(),
        records = store.len(),
        "session ready"
    );
    Ok(SessionController::new(
        store,
        ytdlp.clone(),
        ytdlp,
        ffmpeg,
        config.download_dir.clone(),
        config.lookup_failure,
    ))
}

fn describe(event: &SessionEvent, session: &Session) -> String {
    match event {
        SessionEvent::Enqueued { title, .. } => format!("Queued: {}", title),
        SessionEvent::Started { url } => format!("Downloading: {}", session.display_name(url)),
        SessionEvent::Completed(record) => format!("Saved: {}", record.save_path.display()),
        SessionEvent::Failed { url, reason } => {
            format!("Download failed for {}: {}", session.display_name(url), reason)
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(QueueMessage),
    /// Periodic refresh driving the download queue
    Tick,
    /// Path the spectrogram was saved to, None if the dialog was cancelled
    SpectrogramExported(Result<Option<PathBuf>, String>),
}

pub fn update(app: &mut SongApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                QueueMessage::UrlSubmitted => app.submit(),
                QueueMessage::DownloadSelected(url) => app.select(&url),
                QueueMessage::ExportPressed => return app.export(),
                QueueMessage::UrlChanged(_) => {}
            }
        }
        Message::Tick => app.tick(),
        Message::SpectrogramExported(result) => match result {
            Ok(Some(path)) => {
                app.view.status_message = format!("Saved spectrogram: {}", path.display());
            }
            Ok(None) => {}
            Err(e) => {
                app.view.status_message = e;
            }
        },
    }
    Task::none()
}

pub fn view(app: &SongApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}

pub fn subscription(app: &SongApp) -> Subscription<Message> {
    iced::time::every(app.tick_interval).map(|_| Message::Tick)
}
