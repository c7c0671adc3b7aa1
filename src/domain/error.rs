use std::path::PathBuf;

use thiserror::Error;

/// Failures of the metadata log.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Corrupt metadata log {path} at line {line}: {source}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Metadata log I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    #[error("Failed to launch converter: {0}")]
    Launch(String),

    #[error("Converter exited with {status}: {detail}")]
    Failed { status: String, detail: String },

    #[error("Converter did not report an output file")]
    MissingOutput,

    #[error("I/O error: {0}")]
    Io(String),
}

#[derive(Debug, Clone, Error)]
pub enum TitleLookupError {
    #[error("Failed to launch title lookup: {0}")]
    Launch(String),

    #[error("Title lookup failed: {0}")]
    Failed(String),

    #[error("Invalid title lookup response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum SpectrogramError {
    #[error("Audio file not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Failed to launch renderer: {0}")]
    Launch(String),

    #[error("Renderer failed: {0}")]
    Failed(String),

    #[error("Could not decode rendered image: {0}")]
    Decode(String),
}

/// Everything the session layer can surface to the UI.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Download of {url} failed: {source}")]
    Conversion {
        url: String,
        #[source]
        source: ConversionError,
    },

    #[error(transparent)]
    TitleLookup(#[from] TitleLookupError),

    #[error(transparent)]
    Spectrogram(#[from] SpectrogramError),

    #[error("No completed download for {0}")]
    UnknownDownload(String),
}
