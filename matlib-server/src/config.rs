//! Resolved server configuration
//!
//! Combines the root folder layout with the TOML settings the server uses at
//! runtime. Built once in `main` (or directly in tests) and shared through
//! [`crate::AppState`].

use matlib_common::config::{RootFolderInitializer, TomlConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Everything the server needs after startup resolution
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub layout: RootFolderInitializer,
    pub bind_address: String,
    pub port: u16,
    pub pbr_enabled: bool,
    pub pbr_interpreter: String,
    pub pbr_script: PathBuf,
    pub pbr_resolution: u32,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Server settings from a loaded TOML file rooted at `root`
    pub fn new(root: PathBuf, toml: &TomlConfig) -> Self {
        Self {
            layout: RootFolderInitializer::new(root),
            bind_address: toml.server.bind_address.clone(),
            port: toml.server.port,
            pbr_enabled: toml.pbr.enabled,
            pbr_interpreter: toml.pbr.interpreter.clone(),
            pbr_script: toml.pbr.script.clone(),
            pbr_resolution: toml.pbr.resolution,
            max_upload_bytes: toml.max_upload_bytes,
        }
    }

    /// Defaults rooted at `root`
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self::new(root.into(), &TomlConfig::default())
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn materials_dir(&self) -> PathBuf {
        self.layout.materials_dir()
    }

    pub fn store_path(&self) -> PathBuf {
        self.layout.store_path()
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.layout.staging_dir()
    }

    pub fn presets_dir(&self) -> PathBuf {
        self.layout.presets_dir()
    }

    /// `bind_address:port`, falling back to loopback if the address is malformed
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], self.port)))
    }
}
