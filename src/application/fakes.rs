//! Scripted collaborators for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::domain::{
    ConversionError, Converter, SpectrogramError, SpectrogramRenderer, TitleLookup,
    TitleLookupError,
};

#[derive(Default)]
pub struct FakeTitles {
    titles: HashMap<String, String>,
    calls: Cell<usize>,
}

impl FakeTitles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, title: &str) -> Self {
        self.titles.insert(url.to_string(), title.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl TitleLookup for FakeTitles {
    fn lookup(&self, url: &str) -> Result<String, TitleLookupError> {
        self.calls.set(self.calls.get() + 1);
        self.titles
            .get(url)
            .cloned()
            .ok_or_else(|| TitleLookupError::Failed(format!("video unavailable: {}", url)))
    }
}

/// Succeeds with `<destination>/<name>.mp3` unless a failure is scripted for the URL.
#[derive(Default)]
pub struct FakeConverter {
    failures: HashMap<String, ConversionError>,
    converted: RefCell<Vec<String>>,
}

impl FakeConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failures.insert(
            url.to_string(),
            ConversionError::Failed {
                status: "exit status: 1".to_string(),
                detail: "ERROR: Video unavailable".to_string(),
            },
        );
        self
    }

    pub fn converted(&self) -> Vec<String> {
        self.converted.borrow().clone()
    }
}

impl Converter for FakeConverter {
    fn convert(&self, url: &str, destination: &Path) -> Result<PathBuf, ConversionError> {
        self.converted.borrow_mut().push(url.to_string());
        if let Some(e) = self.failures.get(url) {
            return Err(e.clone());
        }
        let name = url.rsplit('/').next().unwrap_or(url);
        Ok(destination.join(format!("{}.mp3", name)))
    }
}

pub struct FakeRenderer;

impl SpectrogramRenderer for FakeRenderer {
    fn render(&self, source: &Path) -> Result<RgbaImage, SpectrogramError> {
        if !source.exists() {
            return Err(SpectrogramError::SourceMissing(source.to_path_buf()));
        }
        Ok(RgbaImage::new(4, 2))
    }
}
