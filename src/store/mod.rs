//! Append-only metadata log of completed downloads.
//!
//! One JSON object per line:
//! ```text
//! {"url":"...","title":"...","source":"youtube","save_path":"...","artist":null,"album":null}
//! ```
//! The file is created empty when missing and never rewritten in place.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::{DownloadRecord, StoreError};

pub type Result<T> = std::result::Result<T, StoreError>;

pub struct MetadataStore {
    path: PathBuf,
    records: HashMap<String, DownloadRecord>,
    // First-seen order of URLs in the log
    order: Vec<String>,
}

impl MetadataStore {
    /// Open the log at `path`, creating it (and its parent directory) if absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self {
            path: path.into(),
            records: HashMap::new(),
            order: Vec::new(),
        };
        store.load_all()?;
        Ok(store)
    }

    /// Re-read the whole log into memory.
    ///
    /// Strict: a single malformed line fails the load and leaves the
    /// previously loaded view untouched.
    pub fn load_all(&mut self) -> Result<&HashMap<String, DownloadRecord>> {
        let lines = read_log(&self.path)?;

        let mut records = HashMap::with_capacity(lines.len());
        let mut order = Vec::with_capacity(lines.len());
        for record in lines {
            if !records.contains_key(&record.url) {
                order.push(record.url.clone());
            }
            records.insert(record.url.clone(), record);
        }

        info!(path = %self.path.display(), count = records.len(), "loaded metadata log");
        self.records = records;
        self.order = order;
        Ok(&self.records)
    }

    /// Append `record` to the log, then mirror it in memory.
    ///
    /// Does not check for an existing record with the same URL.
    pub fn append(&mut self, record: DownloadRecord) -> Result<()> {
        let mut line = serde_json::to_string(&record).map_err(std::io::Error::other)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;

        debug!(url = %record.url, "appended download record");
        if !self.records.contains_key(&record.url) {
            self.order.push(record.url.clone());
        }
        self.records.insert(record.url.clone(), record);
        Ok(())
    }

    pub fn get(&self, url: &str) -> Option<&DownloadRecord> {
        self.records.get(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.records.contains_key(url)
    }

    /// Records in the order their URL first appeared in the log.
    pub fn records(&self) -> impl Iterator<Item = &DownloadRecord> + '_ {
        self.order.iter().filter_map(|url| self.records.get(url))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

fn read_log(path: &Path) -> Result<Vec<DownloadRecord>> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(path)?;
        info!(path = %path.display(), "created empty metadata log");
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (index, line) in reader.split(b'\n').enumerate() {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        let record = serde_json::from_slice::<DownloadRecord>(&line).map_err(|source| {
            StoreError::Corrupt {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            }
        })?;
        records.push(record);
    }
    Ok(records)
}
