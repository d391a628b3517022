//! Gallery indexer
//!
//! Rebuilds a sorted, paged view of the artifact store from disk on every
//! call. Nothing is cached: the store can change between calls.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

use crate::error::{ImagegenError, Result};
use crate::naming;
use crate::types::{
    GalleryPage, GalleryRecord, SortKey, TimestampSource, IMAGE_EXTENSIONS, METADATA_EXTENSION,
};

/// Images per page when the caller has no preference
pub const DEFAULT_PAGE_SIZE: usize = 9;

/// Fields recovered from a sidecar; each is independently optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidecarFields {
    pub prompt: Option<String>,
    pub model_name: Option<String>,
    pub seed: Option<u64>,
}

pub struct GalleryIndexer {
    store_dir: PathBuf,
}

impl GalleryIndexer {
    pub fn new(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
        }
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// One page of the gallery, sorted by `sort`.
    ///
    /// Pages are 1-based. A page past the end is empty rather than an error.
    pub fn list_page(&self, page: usize, page_size: usize, sort: SortKey) -> Result<GalleryPage> {
        if page_size == 0 {
            return Err(ImagegenError::Validation(
                "page size must be greater than zero".to_string(),
            ));
        }

        let mut records = self.scan()?;
        sort_records(&mut records, sort);

        let total_records = records.len();
        let total_pages = total_pages(total_records, page_size);
        let records = page_slice(records, page, page_size);

        Ok(GalleryPage {
            records,
            page,
            page_size,
            total_pages,
            total_records,
        })
    }

    /// Every image in the store, in file name order
    pub fn scan(&self) -> Result<Vec<GalleryRecord>> {
        if !self.store_dir.exists() {
            debug!("Store {:?} does not exist yet", self.store_dir);
            return Ok(Vec::new());
        }

        let mut images = Vec::new();
        for entry in std::fs::read_dir(&self.store_dir)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    debug!("Skipping unreadable entry in {:?}: {}", self.store_dir, e);
                    continue;
                }
            };
            if path.is_file() && is_image(&path) {
                images.push(path);
            }
        }
        images.sort();

        Ok(self.records_for(images))
    }

    /// The store can change under us; files that vanish mid-scan are skipped
    fn records_for(&self, images: Vec<PathBuf>) -> Vec<GalleryRecord> {
        let mut records = Vec::with_capacity(images.len());
        for path in images {
            match self.record_for(path.clone()) {
                Ok(record) => records.push(record),
                Err(e) => debug!("Skipping {:?}: {}", path, e),
            }
        }
        records
    }

    /// Path of a stored image by file name; rejects anything outside the store
    pub fn locate(&self, file_name: &str) -> Result<PathBuf> {
        let candidate = Path::new(file_name);
        let is_plain_name = candidate.file_name().map(|n| n == candidate.as_os_str()).unwrap_or(false);
        if !is_plain_name {
            return Err(ImagegenError::Validation(format!(
                "'{}' is not a file name in the gallery",
                file_name
            )));
        }

        let path = self.store_dir.join(candidate);
        if !path.is_file() || !is_image(&path) {
            return Err(ImagegenError::Validation(format!(
                "No image named '{}' in {:?}",
                file_name, self.store_dir
            )));
        }
        Ok(path)
    }

    fn record_for(&self, path: PathBuf) -> Result<GalleryRecord> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let sidecar = read_sidecar(&path.with_extension(METADATA_EXTENSION));
        let (timestamp, timestamp_source) = match naming::parse_filename_timestamp(&file_name) {
            Some(ts) => (ts, TimestampSource::Filename),
            None => (filesystem_timestamp(&path)?, TimestampSource::Filesystem),
        };

        Ok(GalleryRecord {
            file_path: path,
            file_name,
            prompt: sidecar.prompt,
            model_name: sidecar.model_name,
            seed: sidecar.seed,
            timestamp,
            timestamp_source,
        })
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read a sidecar file, tolerating absence, bad JSON and legacy keys
pub fn read_sidecar(path: &Path) -> SidecarFields {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return SidecarFields::default(),
    };

    let map = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            debug!("Sidecar {:?} is not a JSON object", path);
            return SidecarFields::default();
        }
        Err(e) => {
            debug!("Sidecar {:?} is not valid JSON: {}", path, e);
            return SidecarFields::default();
        }
    };

    SidecarFields {
        prompt: map.get("prompt").and_then(Value::as_str).map(String::from),
        // older artifacts used `model`
        model_name: map
            .get("model_name")
            .or_else(|| map.get("model"))
            .and_then(Value::as_str)
            .map(String::from),
        seed: map.get("seed").and_then(seed_value),
    }
}

fn seed_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// File creation time, or modification time where creation time is not tracked
fn filesystem_timestamp(path: &Path) -> Result<NaiveDateTime> {
    let metadata = std::fs::metadata(path)?;
    let time = metadata
        .created()
        .or_else(|_| metadata.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH);
    Ok(DateTime::<Local>::from(time).naive_local())
}

/// Stable sort by the requested key
pub fn sort_records(records: &mut [GalleryRecord], sort: SortKey) {
    match sort {
        SortKey::Newest => records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        SortKey::Oldest => records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        SortKey::Model => records.sort_by(|a, b| compare_models(&a.model_name, &b.model_name)),
    }
}

/// Model names ascending; records without a model go last
fn compare_models(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// `ceil(count / page_size)`, never less than 1
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

fn page_slice(records: Vec<GalleryRecord>, page: usize, page_size: usize) -> Vec<GalleryRecord> {
    let Some(start) = page.checked_sub(1).and_then(|p| p.checked_mul(page_size)) else {
        return Vec::new();
    };
    records.into_iter().skip(start).take(page_size).collect()
}
