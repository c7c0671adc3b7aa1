use std::path::Path;
use std::process::{Command, Stdio};

use image::{ImageFormat, RgbaImage};
use tracing::debug;

use super::models::SpectrogramConfig;
use super::stderr_tail;
use crate::domain::{SpectrogramError, SpectrogramRenderer};

/// Renders spectrograms with ffmpeg's `showspectrumpic` filter.
#[derive(Debug, Clone, Default)]
pub struct Ffmpeg {
    config: SpectrogramConfig,
}

impl Ffmpeg {
    pub fn new(config: SpectrogramConfig) -> Self {
        Self { config }
    }

    fn command(&self, source: &Path) -> Command {
        let filter = format!(
            "showspectrumpic=s={}x{}:legend=1",
            self.config.width, self.config.height
        );

        let mut cmd = Command::new(&self.config.program);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-nostdin")
            .arg("-i")
            .arg(source)
            .arg("-lavfi")
            .arg(filter)
            .arg("-frames:v")
            .arg("1")
            .arg("-f")
            .arg("image2pipe")
            .arg("-c:v")
            .arg("png")
            .arg("pipe:1");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl SpectrogramRenderer for Ffmpeg {
    fn render(&self, source: &Path) -> Result<RgbaImage, SpectrogramError> {
        if !source.exists() {
            return Err(SpectrogramError::SourceMissing(source.to_path_buf()));
        }

        debug!(source = %source.display(), "running ffmpeg showspectrumpic");
        let output = self.command(source).output().map_err(|e| {
            SpectrogramError::Launch(format!("{}: {}", self.config.program.display(), e))
        })?;

        if !output.status.success() {
            return Err(SpectrogramError::Failed(stderr_tail(&output.stderr)));
        }

        decode_png(&output.stdout)
    }
}

fn decode_png(bytes: &[u8]) -> Result<RgbaImage, SpectrogramError> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| SpectrogramError::Decode(e.to_string()))?;
    Ok(image.to_rgba8())
}
