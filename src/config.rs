use std::path::PathBuf;
use std::time::Duration;

const APP_DIR: &str = "song-dl";
const DOWNLOAD_DIR_VAR: &str = "SONG_DL_DOWNLOAD_DIR";
const METADATA_FILE_VAR: &str = "SONG_DL_METADATA_FILE";

/// What to do when a title lookup fails while enqueueing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupFailurePolicy {
    /// Accept the URL with a placeholder title.
    #[default]
    UseFallbackTitle,
    /// Reject the URL and surface the error.
    Propagate,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub download_dir: PathBuf,
    pub metadata_file: PathBuf,
    pub log_dir: PathBuf,
    pub ytdlp_program: PathBuf,
    pub ffmpeg_program: PathBuf,
    pub lookup_failure: LookupFailurePolicy,
    /// How often the UI drives the download state machine
    pub tick_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            download_dir: base.join("downloads"),
            metadata_file: base.join("all_downloads.jsonl"),
            log_dir: base.join("logs"),
            ytdlp_program: PathBuf::from("yt-dlp"),
            ffmpeg_program: PathBuf::from("ffmpeg"),
            lookup_failure: LookupFailurePolicy::default(),
            tick_interval: Duration::from_millis(500),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty(DOWNLOAD_DIR_VAR) {
            config.download_dir = PathBuf::from(dir);
        }
        if let Some(file) = non_empty(METADATA_FILE_VAR) {
            config.metadata_file = PathBuf::from(file);
        }
        config
    }
}
