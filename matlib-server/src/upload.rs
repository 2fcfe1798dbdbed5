//! Upload pipeline: stage every file, then generate PBR channels one SKU at a time

use crate::pbr::{channels_present, discard_channels, PbrGenerator};
use crate::staging::{StagedFile, StagingArea};
use matlib_common::channels::extract_sku;
use matlib_common::{Channel, ChannelRole, Error, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Raw file received from the client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Outcome of channel generation for one staged file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PbrStatus {
    /// Not a texture (models)
    None,
    Ready,
    Error,
    /// Generation disabled
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub sku: String,
    pub original_name: String,
    pub file_name: String,
    pub role: ChannelRole,
    pub pbr_status: PbrStatus,
    pub channels: Vec<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub uploaded: Vec<UploadResult>,
    pub rejected: Vec<String>,
}

pub struct UploadPipeline {
    staging: Arc<StagingArea>,
    generator: Option<Arc<dyn PbrGenerator>>,
    resolution: u32,
}

impl UploadPipeline {
    pub fn new(
        staging: Arc<StagingArea>,
        generator: Option<Arc<dyn PbrGenerator>>,
        resolution: u32,
    ) -> Self {
        Self {
            staging,
            generator,
            resolution,
        }
    }

    /// Stage `files` and run generation for every staged texture.
    ///
    /// Files that cannot be staged are rejected individually. Generation
    /// runs sequentially so at most one external process is alive.
    pub async fn process(&self, files: Vec<UploadedFile>) -> Result<UploadReport> {
        if files.is_empty() {
            return Err(Error::Validation("No files uploaded".to_string()));
        }

        let mut report = UploadReport::default();
        let mut staged: Vec<StagedFile> = Vec::new();

        for file in files {
            let sku = extract_sku(&file.file_name);
            if sku.is_empty() {
                report
                    .rejected
                    .push(format!("{}: cannot derive a SKU from the file name", file.file_name));
                continue;
            }
            match self.staging.stage(&sku, &file.file_name, &file.bytes).await {
                Ok(entry) => staged.push(entry),
                Err(e) => {
                    warn!(file = %file.file_name, error = %e, "Upload rejected");
                    report.rejected.push(format!("{}: {}", file.file_name, e));
                }
            }
        }

        for entry in staged {
            let result = self.generate_for(entry).await;
            report.uploaded.push(result);
        }

        info!(
            uploaded = report.uploaded.len(),
            rejected = report.rejected.len(),
            "Upload processed"
        );
        Ok(report)
    }

    /// Re-run channel generation for the colour map already staged for `sku`.
    ///
    /// Used after a failed or skipped generation; the outcome is reported the
    /// same way an upload reports it.
    pub async fn regenerate(&self, sku: &str) -> Result<UploadResult> {
        let entry = self.staging.entry(sku).await?;
        let prefix = format!("{}_Color.", sku);
        let Some(file_name) = entry.files.iter().find(|name| name.starts_with(&prefix)) else {
            return Err(Error::NotFound(format!("No staged colour map for {}", sku)));
        };

        let staged = StagedFile {
            sku: entry.sku.clone(),
            original_name: file_name.clone(),
            file_name: file_name.clone(),
            role: ChannelRole::Color,
            path: entry.directory_path.join(file_name),
        };
        info!(sku = %sku, file = %file_name, "Regenerating PBR channels");
        Ok(self.generate_for(staged).await)
    }

    async fn generate_for(&self, entry: StagedFile) -> UploadResult {
        let mut result = UploadResult {
            sku: entry.sku.clone(),
            original_name: entry.original_name.clone(),
            file_name: entry.file_name.clone(),
            role: entry.role,
            pbr_status: PbrStatus::None,
            channels: Vec::new(),
            error: None,
        };

        if entry.role != ChannelRole::Color {
            return result;
        }

        let Some(generator) = &self.generator else {
            result.pbr_status = PbrStatus::Skipped;
            return result;
        };

        match generator.generate(&entry.path, self.resolution).await {
            Ok(()) => {
                result.channels = channels_present(&entry.path, &entry.sku).await;
                result.pbr_status = PbrStatus::Ready;
                info!(sku = %entry.sku, channels = result.channels.len(), "PBR channels generated");
            }
            Err(e) => {
                warn!(sku = %entry.sku, error = %e, "PBR generation failed");
                discard_channels(&entry.path, &entry.sku).await;
                result.pbr_status = PbrStatus::Error;
                result.error = Some(e.to_string());
            }
        }
        result
    }
}
