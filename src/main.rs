mod app;
mod application;
mod config;
mod domain;
mod logging;
mod media;
mod store;
mod ui;
mod utils;

use iced::window;

fn main() -> iced::Result {
    let config = config::AppConfig::from_env();
    let _log_guard = logging::init(&config.log_dir);
    tracing::info!(
        metadata = %config.metadata_file.display(),
        download_dir = %config.download_dir.display(),
        "starting song-dl"
    );

    iced::application(
        move || app::SongApp::new(config.clone()),
        app::update,
        app::view,
    )
    .title("song-dl")
    .subscription(app::subscription)
    .window(window::Settings {
        size: iced::Size::new(1000.0, 720.0),
        ..Default::default()
    })
    .run()
}
