use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::models::{VideoInfo, YtDlpConfig};
use super::stderr_tail;
use crate::domain::{ConversionError, Converter, TitleLookup, TitleLookupError, FALLBACK_TITLE};

/// yt-dlp backed converter and title lookup.
#[derive(Debug, Clone, Default)]
pub struct YtDlp {
    config: YtDlpConfig,
}

impl YtDlp {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    fn conversion_command(&self, url: &str, destination: &Path) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("--format")
            .arg("bestaudio/best")
            .arg("--extract-audio")
            .arg("--audio-format")
            .arg("mp3")
            .arg("--audio-quality")
            .arg(self.config.audio_quality.to_string())
            .arg("--retries")
            .arg(self.config.retries.to_string())
            .arg("--fragment-retries")
            .arg(self.config.fragment_retries.to_string())
            .arg("--no-playlist")
            .arg("--force-overwrites")
            .arg("--paths")
            .arg(destination)
            .arg("--output")
            .arg(&self.config.output_template)
            // Implies --quiet; the final path is the only thing on stdout
            .arg("--print")
            .arg("after_move:filepath")
            .arg("--no-simulate")
            .arg("--no-warnings")
            .arg("--")
            .arg(url);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn info_command(&self, url: &str) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("--dump-single-json")
            .arg("--skip-download")
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg("--")
            .arg(url);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Converter for YtDlp {
    fn convert(&self, url: &str, destination: &Path) -> Result<PathBuf, ConversionError> {
        fs::create_dir_all(destination).map_err(|e| {
            ConversionError::Io(format!(
                "Failed to create {}: {}",
                destination.display(),
                e
            ))
        })?;

        info!(%url, destination = %destination.display(), "running yt-dlp");
        let output = self
            .conversion_command(url, destination)
            .output()
            .map_err(|e| {
                ConversionError::Launch(format!("{}: {}", self.config.program.display(), e))
            })?;

        if !output.status.success() {
            return Err(ConversionError::Failed {
                status: output.status.to_string(),
                detail: stderr_tail(&output.stderr),
            });
        }

        let path = parse_output_path(&String::from_utf8_lossy(&output.stdout))
            .ok_or(ConversionError::MissingOutput)?;
        debug!(path = %path.display(), "yt-dlp finished");
        // The printed path can still carry the source container's extension
        Ok(path.with_extension("mp3"))
    }
}

impl TitleLookup for YtDlp {
    fn lookup(&self, url: &str) -> Result<String, TitleLookupError> {
        debug!(%url, "looking up title");
        let output = self.info_command(url).output().map_err(|e| {
            TitleLookupError::Launch(format!("{}: {}", self.config.program.display(), e))
        })?;

        if !output.status.success() {
            return Err(TitleLookupError::Failed(stderr_tail(&output.stderr)));
        }

        parse_title(&output.stdout)
    }
}

/// Last non-empty line printed by `--print after_move:filepath`
fn parse_output_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .map(PathBuf::from)
}

fn parse_title(json: &[u8]) -> Result<String, TitleLookupError> {
    let info: VideoInfo = serde_json::from_slice(json)
        .map_err(|e| TitleLookupError::InvalidResponse(format!("JSON decode error: {}", e)))?;

    Ok(info
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string()))
}
