//! Upload staging area
//!
//! Uploaded files land in `staging/<sku>/` and stay invisible to clients
//! until confirmed. Confirming moves them into the repository's asset
//! directory and creates the record; cleanup drops every staging directory.

use crate::repository::MaterialRepository;
use matlib_common::channels::{classify_file, staged_file_name, validate_sku};
use matlib_common::{
    ChannelRole, Error, MaterialPatch, MaterialRecord, PbrSettings, PbrSettingsPatch, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// A file written into staging
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFile {
    pub sku: String,
    pub original_name: String,
    pub file_name: String,
    pub role: ChannelRole,
    #[serde(skip)]
    pub path: PathBuf,
}

/// Contents of one SKU's staging directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingEntry {
    pub sku: String,
    pub directory_path: PathBuf,
    pub files: BTreeSet<String>,
}

/// One item of a confirm request
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmEntry {
    #[serde(default)]
    pub sku: String,
    #[serde(default, alias = "properties")]
    pub metadata: MaterialPatch,
    #[serde(default)]
    pub pbr_settings: Option<PbrSettingsPatch>,
}

impl ConfirmEntry {
    pub fn new(sku: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            ..Self::default()
        }
    }
}

/// Batch confirm outcome; partial success is normal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfirmReport {
    pub confirmed: Vec<String>,
    pub errors: Vec<String>,
}

/// Marks a SKU as being confirmed until dropped
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    sku: String,
}

impl<'a> InFlight<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, sku: &str) -> Result<Self> {
        let mut guard = set.lock().unwrap_or_else(|e| e.into_inner());
        if !guard.insert(sku.to_string()) {
            return Err(Error::AlreadyExists(format!(
                "Confirm for {} already in progress",
                sku
            )));
        }
        Ok(Self {
            set,
            sku: sku.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut guard = self.set.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(&self.sku);
    }
}

pub struct StagingArea {
    staging_dir: PathBuf,
    repository: Arc<MaterialRepository>,
    in_flight: Mutex<HashSet<String>>,
}

impl StagingArea {
    pub fn new(staging_dir: PathBuf, repository: Arc<MaterialRepository>) -> Self {
        Self {
            staging_dir,
            repository,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn sku_dir(&self, sku: &str) -> PathBuf {
        self.staging_dir.join(sku)
    }

    /// Write one uploaded file into `staging/<sku>/`, creating the directory.
    ///
    /// Role is decided here from the original name.
    pub async fn stage(&self, sku: &str, original_name: &str, bytes: &[u8]) -> Result<StagedFile> {
        validate_sku(sku)?;
        let (role, file_name) = staged_file_name(sku, original_name)?;

        let dir = self.sku_dir(sku);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        debug!(sku = %sku, file = %file_name, role = role.as_str(), "File staged");
        Ok(StagedFile {
            sku: sku.to_string(),
            original_name: original_name.to_string(),
            file_name,
            role,
            path,
        })
    }

    pub async fn entry(&self, sku: &str) -> Result<StagingEntry> {
        validate_sku(sku)?;
        let dir = self.sku_dir(sku);
        if !tokio::fs::try_exists(&dir).await? {
            return Err(Error::NotFound(format!(
                "No staging directory found for {}",
                sku
            )));
        }
        let files = list_file_names(&dir).await?.into_iter().collect();
        Ok(StagingEntry {
            sku: sku.to_string(),
            directory_path: dir,
            files,
        })
    }

    /// Every staging entry currently on disk
    pub async fn entries(&self) -> Result<Vec<StagingEntry>> {
        let mut entries = Vec::new();
        for sku in self.staged_skus().await? {
            entries.push(self.entry(&sku).await?);
        }
        Ok(entries)
    }

    /// Confirm a single SKU; all-or-nothing
    pub async fn confirm_one(&self, entry: &ConfirmEntry) -> Result<MaterialRecord> {
        let sku = entry.sku.trim();
        validate_sku(sku)?;
        entry.metadata.validate()?;
        if let Some(settings) = &entry.pbr_settings {
            settings.validate()?;
        }

        let _in_flight = InFlight::acquire(&self.in_flight, sku)?;

        if self.repository.contains(sku).await {
            return Err(Error::AlreadyExists(format!("Material {} already exists", sku)));
        }

        let source_dir = self.sku_dir(sku);
        if !tokio::fs::try_exists(&source_dir).await? {
            return Err(Error::NotFound(format!(
                "No staging directory found for {}",
                sku
            )));
        }

        let target_dir = self.repository.asset_dir(sku);
        let target_existed = tokio::fs::try_exists(&target_dir).await?;
        tokio::fs::create_dir_all(&target_dir).await?;

        let mut moved: Vec<(PathBuf, PathBuf)> = Vec::new();
        let mut channel_files = BTreeMap::new();
        let names = match list_file_names(&source_dir).await {
            Ok(names) => names,
            Err(e) => {
                self.roll_back(&moved, &target_dir, target_existed).await;
                return Err(e);
            }
        };

        for name in names {
            let from = source_dir.join(&name);
            let to = target_dir.join(&name);
            if let Err(e) = move_file(&from, &to).await {
                error!(sku = %sku, file = %name, error = %e, "Move into repository failed");
                self.roll_back(&moved, &target_dir, target_existed).await;
                return Err(e.into());
            }
            moved.push((from, to));
            if let Some(role) = classify_file(&name) {
                channel_files.insert(role, name);
            }
        }

        let record = build_record(sku, entry, channel_files, self.repository.now());
        let record = match self.repository.insert_new(record).await {
            Ok(record) => record,
            Err(e) => {
                self.roll_back(&moved, &target_dir, target_existed).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::remove_dir_all(&source_dir).await {
            warn!(sku = %sku, error = %e, "Confirmed, but staging directory could not be removed");
        }

        info!(sku = %sku, files = moved.len(), "Material confirmed");
        Ok(record)
    }

    /// Confirm each entry independently.
    ///
    /// `pbr_configs` supplies settings for entries that carry none of their own.
    pub async fn confirm_batch(
        &self,
        entries: &[ConfirmEntry],
        pbr_configs: &BTreeMap<String, PbrSettingsPatch>,
    ) -> ConfirmReport {
        let mut report = ConfirmReport::default();

        for entry in entries {
            let mut entry = entry.clone();
            if entry.pbr_settings.is_none() {
                entry.pbr_settings = pbr_configs.get(entry.sku.trim()).cloned();
            }

            match self.confirm_one(&entry).await {
                Ok(record) => report.confirmed.push(record.id),
                Err(e) => {
                    if e.is_item_level() {
                        warn!(sku = %entry.sku, error = %e, "Confirm rejected");
                    } else {
                        error!(sku = %entry.sku, error = %e, "Confirm failed");
                    }
                    let label = if entry.sku.trim().is_empty() {
                        "<missing sku>"
                    } else {
                        entry.sku.trim()
                    };
                    report.errors.push(format!("{}: {}", label, e));
                }
            }
        }

        info!(
            confirmed = report.confirmed.len(),
            errors = report.errors.len(),
            "Confirm batch finished"
        );
        report
    }

    /// Delete every staging directory; returns how many were removed
    pub async fn cleanup(&self) -> Result<usize> {
        let mut removed = 0;
        for sku in self.staged_skus().await? {
            let dir = self.sku_dir(&sku);
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!(removed, "Staging area cleaned");
        Ok(removed)
    }

    async fn staged_skus(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.staging_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut skus = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                skus.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        skus.sort();
        Ok(skus)
    }

    async fn roll_back(&self, moved: &[(PathBuf, PathBuf)], target_dir: &Path, target_existed: bool) {
        for (from, to) in moved.iter().rev() {
            if let Err(e) = move_file(to, from).await {
                error!(file = %to.display(), error = %e, "Rollback could not return file to staging");
            }
        }
        if !target_existed {
            if let Err(e) = tokio::fs::remove_dir(target_dir).await {
                warn!(dir = %target_dir.display(), error = %e, "Rollback left asset directory behind");
            }
        }
    }
}

fn build_record(
    sku: &str,
    entry: &ConfirmEntry,
    channel_files: BTreeMap<ChannelRole, String>,
    now: chrono::DateTime<chrono::Utc>,
) -> MaterialRecord {
    let mut record = MaterialRecord::new(sku, now);
    record.pbr_settings = PbrSettings::confirm_defaults();

    // Files come from disk, not from the request
    let metadata = MaterialPatch {
        channel_files: None,
        ..entry.metadata.clone()
    };
    record.apply(&metadata, now);
    if let Some(settings) = &entry.pbr_settings {
        settings.apply_to(&mut record.pbr_settings);
    }
    record.channel_files = channel_files;
    record
}

async fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Rename, falling back to copy + remove across filesystems
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(_) => {
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_confirm_entry_accepts_properties_alias() {
        let entry: ConfirmEntry = serde_json::from_value(json!({
            "sku": "S1",
            "properties": { "name": "Oak", "tags": "wood,floor" }
        }))
        .unwrap();
        assert_eq!(entry.metadata.name.as_deref(), Some("Oak"));
        assert_eq!(
            entry.metadata.tags,
            Some(vec!["wood".to_string(), "floor".to_string()])
        );
    }

    #[test]
    fn test_build_record_uses_disk_files_and_defaults() {
        let now = chrono::Utc::now();
        let mut entry = ConfirmEntry::new("S1");
        entry.metadata.channel_files = Some(BTreeMap::from([(
            ChannelRole::Normal,
            "bogus.jpg".to_string(),
        )]));
        entry.pbr_settings = Some(PbrSettingsPatch {
            roughness: Some(0.9),
            ..Default::default()
        });

        let files = BTreeMap::from([(ChannelRole::Color, "S1_Color.png".to_string())]);
        let record = build_record("S1", &entry, files.clone(), now);

        assert_eq!(record.channel_files, files);
        assert_eq!(record.pbr_settings.metalness, Some(0.3));
        assert_eq!(record.pbr_settings.roughness, Some(0.9));
        assert_eq!(record.name, "S1");
    }

    #[test]
    fn test_in_flight_guard_blocks_and_releases() {
        let set = Mutex::new(HashSet::new());
        let first = InFlight::acquire(&set, "S1").unwrap();
        assert!(matches!(
            InFlight::acquire(&set, "S1"),
            Err(Error::AlreadyExists(_))
        ));
        drop(first);
        assert!(InFlight::acquire(&set, "S1").is_ok());
    }
}
