//! PBR channel generation collaborator
//!
//! The generator is an external script invoked as
//! `<interpreter> <script> --input <color path> --res <resolution>`. On success
//! it leaves `<base>_<Channel>.jpg` files beside the input. A non-zero exit
//! means "no channels produced": any partial siblings it left are removed
//! and the color file is never touched.

use async_trait::async_trait;
use matlib_common::channels::{resolve_in_dir, Channel};
use matlib_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Produces channel maps beside a color image
#[async_trait]
pub trait PbrGenerator: Send + Sync {
    /// Run generation for `color_path` at `resolution` pixels
    async fn generate(&self, color_path: &Path, resolution: u32) -> Result<()>;
}

/// Runs the generation script through an interpreter
#[derive(Debug, Clone)]
pub struct ScriptPbrGenerator {
    interpreter: String,
    script: PathBuf,
}

impl ScriptPbrGenerator {
    pub fn new(interpreter: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
        }
    }
}

#[async_trait]
impl PbrGenerator for ScriptPbrGenerator {
    async fn generate(&self, color_path: &Path, resolution: u32) -> Result<()> {
        if !color_path.exists() {
            return Err(Error::NotFound(format!(
                "Color file not found: {}",
                color_path.display()
            )));
        }

        debug!(
            input = %color_path.display(),
            resolution,
            script = %self.script.display(),
            "Running PBR generation"
        );

        let output = tokio::task::spawn_blocking({
            let interpreter = self.interpreter.clone();
            let script = self.script.clone();
            let input = color_path.to_path_buf();
            move || {
                Command::new(&interpreter)
                    .arg(&script)
                    .arg("--input")
                    .arg(&input)
                    .arg("--res")
                    .arg(resolution.to_string())
                    .output()
            }
        })
        .await
        .map_err(|e| Error::Internal(format!("PBR task panicked: {}", e)))?
        .map_err(|e| Error::ExternalProcess(format!("Failed to start {}: {}", self.interpreter, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ExternalProcess(format!(
                "PBR generation exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Channels whose files exist beside `color_path`, in load order
pub async fn channels_present(color_path: &Path, base_id: &str) -> Vec<Channel> {
    let Some((dir, name)) = split_color_path(color_path) else {
        return Vec::new();
    };

    let mut present = Vec::new();
    for (channel, path) in resolve_in_dir(dir, base_id, name) {
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            present.push(channel);
        }
    }
    present
}

/// Remove sibling channel files after a failed run
pub async fn discard_channels(color_path: &Path, base_id: &str) {
    let Some((dir, name)) = split_color_path(color_path) else {
        return;
    };

    for (channel, path) in resolve_in_dir(dir, base_id, name) {
        if path == color_path {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(channel = %channel, path = %path.display(), "Partial channel removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove partial channel"),
        }
    }
}

fn split_color_path(color_path: &Path) -> Option<(&Path, &str)> {
    let dir = color_path.parent()?;
    let name = color_path.file_name()?.to_str()?;
    Some((dir, name))
}
