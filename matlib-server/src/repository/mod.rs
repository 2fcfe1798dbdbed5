//! Material repository
//!
//! JSON-backed store of [`MaterialRecord`]s keyed by SKU. Every read re-stats
//! the backing file and reloads when its stamp moved, so edits made by
//! another process are observed. Reads never fail on a corrupt file: a
//! warning is logged and an empty store is served. Writes go through
//! [`durable::write_verified`] and are strict.

pub mod cache;
pub mod durable;

use crate::config::ServerConfig;
use cache::{FileStamp, StoreCache};
use matlib_common::channels::{classify_file, validate_sku};
use matlib_common::time::{Clock, SystemClock};
use matlib_common::{
    ChannelRole, Error, MaterialPatch, MaterialRecord, MaterialStore, PbrSettings,
    PbrSettingsPatch, Result,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Outcome of a batch delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub errors: Vec<String>,
}

pub struct MaterialRepository {
    store_path: PathBuf,
    materials_dir: PathBuf,
    cache: Mutex<StoreCache>,
    clock: Arc<dyn Clock>,
}

impl MaterialRepository {
    /// Repository over `store_path`, with one asset directory per SKU under `materials_dir`
    pub fn new(store_path: PathBuf, materials_dir: PathBuf) -> Self {
        Self {
            store_path,
            materials_dir,
            cache: Mutex::new(StoreCache::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.store_path(), config.materials_dir())
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Directory holding one SKU's files
    pub fn asset_dir(&self, sku: &str) -> PathBuf {
        self.materials_dir.join(sku)
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub async fn get(&self, sku: &str) -> Result<MaterialRecord> {
        let mut cache = self.cache.lock().await;
        self.refresh(&mut cache)
            .await
            .materials
            .get(sku)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Material not found: {}", sku)))
    }

    pub async fn get_all(&self) -> BTreeMap<String, MaterialRecord> {
        let mut cache = self.cache.lock().await;
        self.refresh(&mut cache).await.materials.clone()
    }

    pub async fn contains(&self, sku: &str) -> bool {
        let mut cache = self.cache.lock().await;
        self.refresh(&mut cache).await.materials.contains_key(sku)
    }

    /// Create or merge-update `sku`, stamping `updatedAt`
    pub async fn upsert(&self, sku: &str, patch: &MaterialPatch) -> Result<MaterialRecord> {
        Self::check_write(sku, patch)?;
        let now = self.clock.now();

        self.mutate(|store| {
            let record = store
                .materials
                .entry(sku.to_string())
                .or_insert_with(|| MaterialRecord::new(sku, now));
            record.apply(patch, now);
            Ok(record.clone())
        })
        .await
    }

    /// Merge-update an existing record
    pub async fn update(&self, sku: &str, patch: &MaterialPatch) -> Result<MaterialRecord> {
        Self::check_write(sku, patch)?;
        let now = self.clock.now();

        self.mutate(|store| {
            let record = store
                .materials
                .get_mut(sku)
                .ok_or_else(|| Error::NotFound(format!("Material not found: {}", sku)))?;
            record.apply(patch, now);
            Ok(record.clone())
        })
        .await
    }

    /// Insert a record whose SKU must not exist yet
    pub async fn insert_new(&self, mut record: MaterialRecord) -> Result<MaterialRecord> {
        validate_sku(&record.id)?;
        let now = self.clock.now();
        record.created_at = now;
        record.updated_at = now;

        self.mutate(|store| {
            if store.materials.contains_key(&record.id) {
                return Err(Error::AlreadyExists(format!(
                    "SKU {} already exists",
                    record.id
                )));
            }
            store.materials.insert(record.id.clone(), record.clone());
            Ok(record)
        })
        .await
    }

    /// Stored PBR settings, or defaults when the record has never been tuned
    pub async fn pbr_settings(&self, sku: &str) -> Result<PbrSettings> {
        self.get(sku).await.map(|record| record.pbr_settings)
    }

    pub async fn update_pbr_settings(
        &self,
        sku: &str,
        settings: &PbrSettingsPatch,
    ) -> Result<PbrSettings> {
        let patch = MaterialPatch {
            pbr_settings: Some(settings.clone()),
            ..MaterialPatch::default()
        };
        self.update(sku, &patch).await.map(|record| record.pbr_settings)
    }

    /// Remove the record, then its asset directory
    pub async fn delete(&self, sku: &str) -> Result<()> {
        validate_sku(sku)?;
        self.mutate(|store| {
            store
                .materials
                .remove(sku)
                .map(|_| ())
                .ok_or_else(|| Error::NotFound(format!("Material not found: {}", sku)))
        })
        .await?;

        let dir = self.asset_dir(sku);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!(sku = %sku, "Asset directory removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(sku = %sku, error = %e, "Record deleted but asset directory remains"),
        }
        info!(sku = %sku, "Material deleted");
        Ok(())
    }

    /// Delete several SKUs; failures are reported per item
    pub async fn delete_many(&self, skus: &[String]) -> DeleteReport {
        let mut report = DeleteReport::default();
        for sku in skus {
            match self.delete(sku).await {
                Ok(()) => report.deleted.push(sku.clone()),
                Err(e) => report.errors.push(format!("{}: {}", sku, e)),
            }
        }
        report
    }

    /// Files in the SKU's asset directory, classified by naming convention
    pub async fn list_files(&self, sku: &str) -> Result<BTreeMap<ChannelRole, String>> {
        validate_sku(sku)?;
        let dir = self.asset_dir(sku);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("No files for material {}", sku)));
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = BTreeMap::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(role) = classify_file(&name) {
                files.entry(role).or_insert(name);
            }
        }
        Ok(files)
    }

    fn check_write(sku: &str, patch: &MaterialPatch) -> Result<()> {
        validate_sku(sku)?;
        if patch.is_empty() {
            return Err(Error::Validation("Material data is required".to_string()));
        }
        patch.validate()
    }

    /// Apply `f` to a copy of the current store and persist it.
    ///
    /// The cache only moves forward when the write verified.
    async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut MaterialStore) -> Result<T>,
    {
        let mut cache = self.cache.lock().await;
        let mut store = self.refresh(&mut cache).await.clone();
        let value = f(&mut store)?;

        let bytes = serde_json::to_vec_pretty(&store)?;
        let stamp = durable::write_verified::<MaterialStore>(&self.store_path, &bytes).await?;
        cache.replace(store, Some(stamp));
        Ok(value)
    }

    async fn refresh<'a>(&self, cache: &'a mut StoreCache) -> &'a MaterialStore {
        let stamp = match FileStamp::of(&self.store_path).await {
            Ok(stamp) => stamp,
            Err(e) => {
                warn!(path = %self.store_path.display(), error = %e, "Cannot stat material store");
                None
            }
        };

        if cache.is_fresh(stamp) {
            return cache.data();
        }

        let store = match stamp {
            Some(_) => self.read_store().await,
            None => MaterialStore::default(),
        };
        cache.replace(store, stamp)
    }

    async fn read_store(&self) -> MaterialStore {
        let bytes = match tokio::fs::read(&self.store_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    path = %self.store_path.display(),
                    error = %e,
                    "Material store unreadable, serving empty store"
                );
                return MaterialStore::default();
            }
        };

        match serde_json::from_slice::<MaterialStore>(&bytes) {
            Ok(mut store) => {
                store.normalize_ids();
                debug!(count = store.materials.len(), "Material store loaded");
                store
            }
            Err(e) => {
                warn!(
                    path = %self.store_path.display(),
                    error = %e,
                    "Material store is corrupt, serving empty store"
                );
                MaterialStore::default()
            }
        }
    }
}
