use std::path::PathBuf;

use serde::Deserialize;

/// Subset of `yt-dlp --dump-single-json` output
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub title: Option<String>,
}

/// Configuration for the yt-dlp backend
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    pub program: PathBuf,
    pub retries: u32,
    pub fragment_retries: u32,
    /// 0 is best VBR quality
    pub audio_quality: u8,
    pub output_template: String,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            retries: 10,
            fragment_retries: 10,
            audio_quality: 0,
            output_template: "%(title)s.%(ext)s".to_string(),
        }
    }
}

/// Configuration for the ffmpeg spectrogram renderer
#[derive(Debug, Clone)]
pub struct SpectrogramConfig {
    pub program: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            width: 1024,
            height: 1024,
        }
    }
}
