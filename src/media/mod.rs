pub mod models;
pub mod spectrogram;
pub mod ytdlp;

pub use models::{SpectrogramConfig, YtDlpConfig};
pub use spectrogram::Ffmpeg;
pub use ytdlp::YtDlp;

/// Last few non-empty stderr lines of an external tool, for error messages.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let start = lines.len().saturating_sub(3);
    if lines.is_empty() {
        "no error output".to_string()
    } else {
        lines[start..].join("; ")
    }
}
