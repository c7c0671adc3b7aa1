use iced::{
    widget::{button, column, container, image::Handle, row, scrollable, text, text_input},
    widget::{Column, Image, Space},
    Color, Element, Length,
};
use image::RgbaImage;

const PENDING_GREY: Color = Color::from_rgb(0.5, 0.5, 0.5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Completed,
    Active,
    Pending,
}

/// One row of the download list
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub url: String,
    pub title: String,
    pub state: EntryState,
}

/// Spectrogram currently on screen
pub struct SpectrogramView {
    pub title: String,
    pub image: RgbaImage,
    handle: Handle,
}

impl SpectrogramView {
    pub fn new(title: String, image: RgbaImage) -> Self {
        let handle = Handle::from_rgba(image.width(), image.height(), image.as_raw().clone());
        Self {
            title,
            image,
            handle,
        }
    }
}

/// Main view state
pub struct QueueView {
    pub url_input: String,
    pub status_message: String,
    pub entries: Vec<QueueEntry>,
    pub spectrogram: Option<SpectrogramView>,
}

impl Default for QueueView {
    fn default() -> Self {
        Self {
            url_input: String::new(),
            status_message: "Paste a video URL and press Enter".to_string(),
            entries: Vec::new(),
            spectrogram: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum QueueMessage {
    UrlChanged(String),
    UrlSubmitted,
    DownloadSelected(String),
    ExportPressed,
}

impl QueueView {
    pub fn update(&mut self, message: QueueMessage) {
        if let QueueMessage::UrlChanged(url) = message {
            self.url_input = url;
        }
        // Everything else needs the session and is handled by the app
    }

    fn active(&self) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.state == EntryState::Active)
    }

    pub fn view(&self) -> Element<'_, QueueMessage> {
        let mut left = column![
            text("song-dl").size(32),
            Space::new().height(Length::Fixed(10.0)),
            text("yt url:").size(16),
            text_input("Paste a video URL...", &self.url_input)
                .on_input(QueueMessage::UrlChanged)
                .on_submit(QueueMessage::UrlSubmitted)
                .padding(10),
            text(&self.status_message).size(14),
        ]
        .spacing(10)
        .width(Length::FillPortion(1));

        if let Some(active) = self.active() {
            left = left
                .push(Space::new().height(Length::Fixed(10.0)))
                .push(text("Currently Downloading").size(20))
                .push(text(&active.title));
        }

        if let Some(spectrogram) = &self.spectrogram {
            left = left
                .push(Space::new().height(Length::Fixed(10.0)))
                .push(text("spectrogram").size(20))
                .push(Image::new(spectrogram.handle.clone()).width(Length::Fill))
                .push(
                    button("Save PNG")
                        .on_press(QueueMessage::ExportPressed)
                        .padding([10, 20]),
                );
        }

        let mut list = Column::new().spacing(4);
        if self.entries.is_empty() {
            list = list.push(text("No downloads in queue").color(PENDING_GREY));
        }
        for entry in &self.entries {
            let item: Element<'_, QueueMessage> = match entry.state {
                EntryState::Completed => button(text(format!("✓ {}", entry.title)))
                    .on_press(QueueMessage::DownloadSelected(entry.url.clone()))
                    .style(button::success)
                    .width(Length::Fill)
                    .into(),
                EntryState::Active => container(text(format!("⟳ {}", entry.title)))
                    .padding([8, 12])
                    .width(Length::Fill)
                    .style(container::dark)
                    .into(),
                EntryState::Pending => {
                    container(text(format!("⋯ {}", entry.title)).color(PENDING_GREY))
                        .padding([8, 12])
                        .width(Length::Fill)
                        .into()
                }
            };
            list = list.push(item);
        }

        row![left, scrollable(list).width(Length::FillPortion(1))]
            .padding(20)
            .spacing(20)
            .into()
    }
}
