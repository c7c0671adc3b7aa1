//! Boundaries to the external tools the session depends on.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use super::error::{ConversionError, SpectrogramError, TitleLookupError};

/// Fetches remote media and transcodes it to an audio file.
///
/// Blocks until the conversion finishes; there is no cancellation.
pub trait Converter {
    fn convert(&self, url: &str, destination: &Path) -> Result<PathBuf, ConversionError>;
}

/// Metadata-only query for a human readable title.
pub trait TitleLookup {
    fn lookup(&self, url: &str) -> Result<String, TitleLookupError>;
}

/// Local, stateless transform of an audio file into a spectrogram image.
pub trait SpectrogramRenderer {
    fn render(&self, source: &Path) -> Result<RgbaImage, SpectrogramError>;
}

impl<T: Converter + ?Sized> Converter for &T {
    fn convert(&self, url: &str, destination: &Path) -> Result<PathBuf, ConversionError> {
        (**self).convert(url, destination)
    }
}

impl<T: TitleLookup + ?Sized> TitleLookup for &T {
    fn lookup(&self, url: &str) -> Result<String, TitleLookupError> {
        (**self).lookup(url)
    }
}

impl<T: SpectrogramRenderer + ?Sized> SpectrogramRenderer for &T {
    fn render(&self, source: &Path) -> Result<RgbaImage, SpectrogramError> {
        (**self).render(source)
    }
}
