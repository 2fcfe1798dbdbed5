//! Per-project preset files (`projects/<project>Presets.json`)

use crate::repository::durable::write_verified;
use matlib_common::channels::validate_sku;
use matlib_common::{Error, PresetBook, Result};
use std::path::PathBuf;
use tracing::info;

pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// File holding `project`'s presets; project names follow SKU rules
    pub fn path_for(&self, project: &str) -> Result<PathBuf> {
        validate_sku(project)
            .map_err(|_| Error::Validation(format!("Invalid project name: {}", project)))?;
        Ok(self.dir.join(format!("{}Presets.json", project)))
    }

    /// Presets of `project`, normalized to the flat form
    pub async fn load(&self, project: &str) -> Result<PresetBook> {
        let path = self.path_for(project)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("Presets not found for {}", project)));
            }
            Err(e) => return Err(e.into()),
        };
        let book: PresetBook = serde_json::from_slice(&bytes)?;
        Ok(book.normalized())
    }

    /// Persist `book` in the flat form with backup and verification
    pub async fn save(&self, project: &str, book: &PresetBook) -> Result<PresetBook> {
        let path = self.path_for(project)?;
        let normalized = book.normalized();
        let bytes = serde_json::to_vec_pretty(&normalized)?;
        write_verified::<PresetBook>(&path, &bytes).await?;
        info!(project = %project, presets = normalized.presets.len(), "Presets saved");
        Ok(normalized)
    }
}
