//! In-memory store cache keyed on the backing file's stamp

use matlib_common::MaterialStore;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Identity of one version of the backing file.
///
/// Length is carried next to the modification time so two writes landing
/// inside one coarse mtime tick are still told apart in most cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: SystemTime,
    pub len: u64,
}

impl FileStamp {
    pub fn from_metadata(metadata: &Metadata) -> io::Result<Self> {
        Ok(Self {
            modified: metadata.modified()?,
            len: metadata.len(),
        })
    }

    /// Stamp of the file at `path`, `None` if it does not exist
    pub async fn of(path: &Path) -> io::Result<Option<Self>> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Self::from_metadata(&metadata).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Parsed store plus the stamp of the file it was parsed from
#[derive(Debug, Default)]
pub struct StoreCache {
    data: MaterialStore,
    source_stamp: Option<FileStamp>,
    loaded: bool,
}

impl StoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the cached store was loaded from exactly `stamp`
    pub fn is_fresh(&self, stamp: Option<FileStamp>) -> bool {
        self.loaded && self.source_stamp == stamp
    }

    pub fn data(&self) -> &MaterialStore {
        &self.data
    }

    pub fn replace(&mut self, store: MaterialStore, stamp: Option<FileStamp>) -> &MaterialStore {
        self.data = store;
        self.source_stamp = stamp;
        self.loaded = true;
        &self.data
    }

    pub fn invalidate(&mut self) {
        self.data = MaterialStore::default();
        self.source_stamp = None;
        self.loaded = false;
    }

    pub fn source_stamp(&self) -> Option<FileStamp> {
        self.source_stamp
    }
}
