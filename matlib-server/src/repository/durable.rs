//! Backup-before-write, verify-after-write
//!
//! 1. copy the current file (if any) to `<name>.backup`
//! 2. write the new bytes
//! 3. re-read and re-parse what landed on disk
//!
//! When step 3 fails the backup is copied back (or the file removed when
//! there was no previous version) and a `Persistence` error is returned.

use super::cache::FileStamp;
use matlib_common::{Error, Result};
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// `<path>.backup`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("store"));
    name.push(".backup");
    path.with_file_name(name)
}

/// Write `bytes` to `path`, verifying they parse back as `T`
pub async fn write_verified<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<FileStamp> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let backup = backup_path(path);
    let had_previous = tokio::fs::try_exists(path).await?;
    if had_previous {
        tokio::fs::copy(path, &backup).await?;
    }

    tokio::fs::write(path, bytes).await?;

    let verified = match tokio::fs::read(path).await {
        Ok(written) => serde_json::from_slice::<T>(&written).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    if let Err(reason) = verified {
        error!(path = %path.display(), reason = %reason, "Write verification failed, restoring");
        restore(path, &backup, had_previous).await;
        return Err(Error::Persistence(format!(
            "Verification of {} failed: {}",
            path.display(),
            reason
        )));
    }

    let stamp = FileStamp::of(path)
        .await?
        .ok_or_else(|| Error::Persistence(format!("{} vanished after write", path.display())))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Store written and verified");
    Ok(stamp)
}

async fn restore(path: &Path, backup: &Path, had_previous: bool) {
    let outcome = if had_previous {
        tokio::fs::copy(backup, path).await.map(|_| ())
    } else {
        tokio::fs::remove_file(path).await
    };
    if let Err(e) = outcome {
        warn!(path = %path.display(), error = %e, "Could not restore previous version");
    }
}
