//! Shared fixtures for matlib-client integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use matlib_client::{
    BindingSession, ClientError, ClientResult, MaterialSource, SceneGraph, Texture, TextureLoader,
};
use matlib_common::{ChannelRole, MaterialRecord};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory repository counting every fetch
#[derive(Default)]
pub struct MemorySource {
    records: Mutex<BTreeMap<String, MaterialRecord>>,
    pub fetches: AtomicUsize,
    pub fetched: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source holding one color-only record per SKU
    pub fn with_skus(skus: &[&str]) -> Self {
        let source = Self::new();
        for sku in skus {
            source.insert(record(sku));
        }
        source
    }

    pub fn insert(&self, record: MaterialRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MaterialSource for MemorySource {
    async fn fetch(&self, sku: &str) -> ClientResult<MaterialRecord> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fetched.lock().unwrap().push(sku.to_string());
        self.records
            .lock()
            .unwrap()
            .get(sku)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(sku.to_string()))
    }
}

/// Loader that succeeds for every path except those marked missing
#[derive(Default)]
pub struct MemoryLoader {
    missing: Mutex<BTreeSet<String>>,
    pub loads: AtomicUsize,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_missing(&self, path: &str) {
        self.missing.lock().unwrap().insert(path.to_string());
    }
}

#[async_trait]
impl TextureLoader for MemoryLoader {
    async fn load(&self, path: &str) -> ClientResult<Texture> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.missing.lock().unwrap().contains(path) {
            return Err(ClientError::TextureLoad {
                path: path.to_string(),
                reason: "missing".to_string(),
            });
        }
        Ok(Texture::new(path, 1))
    }
}

/// Record with a color file named by convention
pub fn record(sku: &str) -> MaterialRecord {
    let mut record = MaterialRecord::new(sku, chrono::Utc::now());
    record
        .channel_files
        .insert(ChannelRole::Color, format!("{}_Color.png", sku));
    record
}

/// Scene with `count` spawned meshes, returned with their identifiers
pub fn scene_with_meshes(count: usize) -> (SceneGraph, Vec<String>) {
    let mut scene = SceneGraph::new();
    let ids = (0..count).map(|_| scene.spawn_mesh()).collect();
    (scene, ids)
}

pub fn session(
    scene: SceneGraph,
    source: Arc<MemorySource>,
) -> BindingSession<SceneGraph> {
    BindingSession::new(scene, source, Arc::new(MemoryLoader::new()))
}
